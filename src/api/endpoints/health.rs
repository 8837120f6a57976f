//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub appointments: i64,
    pub inventory: i64,
    pub medical_records: i64,
}

/// `GET /api/health`: liveness plus table counts.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let conn = ctx.core.open_db()?;

    Ok(Json(HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: crate::config::APP_VERSION,
        appointments: db::count_appointments(&conn)?,
        inventory: db::count_inventory(&conn)?,
        medical_records: db::count_medical_records(&conn)?,
    }))
}
