//! REST API.
//!
//! Routes are nested under `/api/`. Protected routes pass through
//! Audit → Auth → Handler; `/api/health` and `/api/auth/login` skip auth.
//! The router is composable: `api_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server_on, ApiServer, ServerError, ServerSession};
pub use types::ApiContext;
