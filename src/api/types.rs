//! Shared types for the API layer.

use std::sync::Arc;

use crate::api::error::ApiError;
use crate::authorization::{is_permitted, Capability};
use crate::core_state::CoreState;
use crate::models::{Role, User};

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// User context: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated caller, injected into request extensions by the auth
/// middleware after the bearer token verifies.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user: User,
}

impl UserContext {
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Reject with 403 unless the caller's role holds `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        if is_permitted(self.user.role, capability) {
            Ok(())
        } else {
            tracing::warn!(
                email = %self.user.email,
                role = %self.user.role,
                route = capability.route(),
                "Role not permitted"
            );
            Err(ApiError::Forbidden {
                capability,
                role: self.user.role,
            })
        }
    }
}

/// Per-request correlation id, set by the audit middleware.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);
