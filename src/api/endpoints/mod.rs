//! API endpoint handlers.
//!
//! One module per resource. Handlers open a connection per request,
//! check the caller's capability, and delegate to the repositories.

pub mod appointments;
pub mod auth;
pub mod health;
pub mod inventory;
pub mod medical_records;

use serde::Serialize;

use crate::api::error::ApiError;

/// `{message}` body for deletes and logout.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Trim and drop blank strings. Optional text fields store NULL, never "".
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 400 naming every required field that is missing or blank.
pub(crate) fn missing_fields(fields: &[(&str, bool)]) -> ApiError {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| *name)
        .collect();
    ApiError::BadRequest(format!("Missing required fields: {}", missing.join(", ")))
}
