//! API error types with structured JSON responses.
//!
//! Body shape: `{"error": <message>, "code": <CODE>, ...detail}` where
//! detail keys sit next to `error` so clients can read them directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use crate::authorization::Capability;
use crate::core_state::CoreError;
use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::models::{Appointment, RecordSummary, Role};
use crate::prescriptions::{ReconcileError, StockShortage};
use crate::scheduling::TimeParseError;

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No token provided")]
    Unauthorized,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Insufficient permissions")]
    Forbidden { capability: Capability, role: Role },
    #[error("Access denied to this medical record")]
    RecordAccessDenied,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Time slot conflicts with an existing appointment")]
    AppointmentConflict {
        conflicting: Box<Appointment>,
        suggested_times: Vec<String>,
    },
    #[error("A medical record already exists for this patient")]
    DuplicateRecord(Box<RecordSummary>),
    #[error("{0}")]
    InsufficientStock(StockShortage),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::TokenExpired | Self::InvalidToken | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden { .. } | Self::RecordAccessDenied => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            Self::AppointmentConflict { .. } | Self::DuplicateRecord(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "AUTH_REQUIRED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "TOKEN_INVALID",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::RecordAccessDenied => "RECORD_ACCESS_DENIED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::AppointmentConflict { .. } => "APPOINTMENT_CONFLICT",
            Self::DuplicateRecord(_) => "DUPLICATE_RECORD",
            Self::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn body(&self) -> Map<String, Value> {
        let message = match self {
            Self::NotFound(detail) | Self::BadRequest(detail) => detail.clone(),
            Self::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let mut body = Map::new();
        body.insert("error".into(), Value::String(message));
        body.insert("code".into(), Value::String(self.code().into()));

        match self {
            Self::Forbidden { capability, role } => {
                let allowed: Vec<&str> = capability.allowed_roles().iter().map(Role::as_str).collect();
                body.insert(
                    "message".into(),
                    Value::String(format!(
                        "This action requires one of the following roles: {}",
                        allowed.join(", ")
                    )),
                );
                body.insert("allowedRoles".into(), json!(allowed));
                body.insert("role".into(), json!(role));
            }
            Self::AppointmentConflict {
                conflicting,
                suggested_times,
            } => {
                body.insert("conflictingAppointment".into(), json!(conflicting));
                body.insert("suggestedTimes".into(), json!(suggested_times));
            }
            Self::DuplicateRecord(existing) => {
                body.insert("existingRecord".into(), json!(existing));
            }
            Self::InsufficientStock(shortage) => {
                body.insert("shortage".into(), json!(shortage));
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(Value::Object(self.body()))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => e.into(),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} {id} not found"))
            }
            DatabaseError::ConstraintViolation(detail) => ApiError::Conflict(detail),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::TokenExpired => ApiError::TokenExpired,
            CryptoError::InvalidToken => ApiError::InvalidToken,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::InvalidQuantity { .. } | ReconcileError::QuantityOverflow { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            ReconcileError::ItemNotFound(_) => ApiError::NotFound(err.to_string()),
            ReconcileError::InsufficientStock(shortage) => ApiError::InsufficientStock(shortage),
            ReconcileError::Database(e) => e.into(),
        }
    }
}

impl From<TimeParseError> for ApiError {
    fn from(err: TimeParseError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use chrono::NaiveDate;

    async fn json_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let (status, json) = json_of(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "AUTH_REQUIRED");
        assert_eq!(json["error"], "No token provided");
    }

    #[tokio::test]
    async fn forbidden_lists_allowed_roles() {
        let (status, json) = json_of(ApiError::Forbidden {
            capability: Capability::ManageInventory,
            role: Role::Doctor,
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Insufficient permissions");
        assert_eq!(json["allowedRoles"], json!(["nurse", "admin"]));
        assert_eq!(
            json["message"],
            "This action requires one of the following roles: nurse, admin"
        );
    }

    #[tokio::test]
    async fn appointment_conflict_carries_detail() {
        let conflicting = Appointment {
            id: 7,
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            time: "09:00".into(),
            client_name: "Ann".into(),
            email: None,
            id_number: None,
            service: "Checkup".into(),
            created_at: "2024-01-01T00:00:00+00:00".into(),
        };
        let (status, json) = json_of(ApiError::AppointmentConflict {
            conflicting: Box::new(conflicting),
            suggested_times: vec!["08:00".into()],
        })
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["conflictingAppointment"]["id"], 7);
        assert_eq!(json["conflictingAppointment"]["clientName"], "Ann");
        assert_eq!(json["suggestedTimes"], json!(["08:00"]));
    }

    #[tokio::test]
    async fn shortage_is_400_with_detail() {
        let shortage = StockShortage {
            item_id: 3,
            item_name: "Amoxicillin".into(),
            available: 5,
            required: Some(6),
            additional_needed: None,
            shortage: 1,
        };
        let (status, json) = json_of(ApiError::InsufficientStock(shortage)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(json["shortage"]["shortage"], 1);
        assert!(json["error"].as_str().unwrap().contains("Currently available: 5"));
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let (status, json) = json_of(ApiError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "An internal error occurred");
    }

    #[test]
    fn database_errors_map_by_kind() {
        let err: ApiError = DatabaseError::not_found("appointment", 4).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = DatabaseError::ConstraintViolation("dup".into()).into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = DatabaseError::CorruptedColumn {
            column: "x".into(),
            reason: "y".into(),
        }
        .into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn crypto_errors_map_to_401() {
        assert!(matches!(ApiError::from(CryptoError::TokenExpired), ApiError::TokenExpired));
        assert!(matches!(ApiError::from(CryptoError::InvalidToken), ApiError::InvalidToken));
    }

    #[test]
    fn reconcile_errors_map_by_kind() {
        let err: ApiError = ReconcileError::ItemNotFound(9).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = ReconcileError::InvalidQuantity { item_id: 1, quantity: 0 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = ReconcileError::QuantityOverflow { item_id: 1 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
