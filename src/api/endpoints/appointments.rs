//! Appointment endpoints.
//!
//! - `GET /api/appointments`: all appointments, newest first
//! - `POST /api/appointments`: book, refusing slots within an hour of another
//! - `GET /api/appointments/available-slots?date=`: free slots for a day
//! - `GET /api/appointments/patient/:identifier`: by email or id number
//! - `GET /api/appointments/:id`
//! - `DELETE /api/appointments/:id`

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDate;
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};

use super::{missing_fields, non_blank, MessageResponse};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::authorization::Capability;
use crate::db;
use crate::models::{Appointment, NewAppointment};
use crate::scheduling;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub client_name: Option<String>,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub suggested_times: Vec<String>,
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: '{value}' (expected YYYY-MM-DD)")))
}

/// `GET /api/appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    caller.require(Capability::ListAppointments)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_appointments(&conn)?))
}

/// `GET /api/appointments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(id): Path<i64>,
) -> Result<Json<Appointment>, ApiError> {
    caller.require(Capability::ListAppointments)?;
    let conn = ctx.core.open_db()?;
    db::get_appointment(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Appointment not found".into()))
}

/// `POST /api/appointments`
///
/// The day's bookings are read and the new one inserted inside one
/// IMMEDIATE transaction so two concurrent bookings cannot both pass
/// the conflict check.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    caller.require(Capability::CreateAppointment)?;

    let (date, time, client_name, service) = match (
        non_blank(request.date),
        non_blank(request.time),
        non_blank(request.client_name),
        non_blank(request.service),
    ) {
        (Some(date), Some(time), Some(client_name), Some(service)) => {
            (date, time, client_name, service)
        }
        (date, time, client_name, service) => {
            return Err(missing_fields(&[
                ("date", date.is_none()),
                ("time", time.is_none()),
                ("clientName", client_name.is_none()),
                ("service", service.is_none()),
            ]));
        }
    };

    let date = parse_date(&date)?;
    let minutes = scheduling::parse_time(&time)?;

    let mut conn = ctx.core.open_db()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let same_day = db::list_appointments_on_date(&tx, date)?;
    if let Some(conflict) = scheduling::find_conflict(minutes, &same_day) {
        tracing::info!(
            %date,
            time = %scheduling::format_time(minutes),
            conflicting_id = conflict.id,
            "Appointment slot conflict"
        );
        return Err(ApiError::AppointmentConflict {
            conflicting: Box::new(conflict.clone()),
            suggested_times: scheduling::suggested_times_or_placeholder(&same_day),
        });
    }

    let appointment = db::insert_appointment(
        &tx,
        &NewAppointment {
            date,
            time: scheduling::format_time(minutes),
            client_name,
            email: non_blank(request.email),
            id_number: non_blank(request.id_number),
            service,
        },
    )?;
    tx.commit()?;

    tracing::info!(id = appointment.id, %date, time = %appointment.time, "Appointment booked");
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// `GET /api/appointments/available-slots?date=YYYY-MM-DD`
pub async fn available_slots(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    caller.require(Capability::SuggestSlots)?;
    let date = non_blank(query.date)
        .ok_or_else(|| ApiError::BadRequest("Date parameter is required".into()))?;
    let date = parse_date(&date)?;

    let conn = ctx.core.open_db()?;
    let same_day = db::list_appointments_on_date(&conn, date)?;

    Ok(Json(SlotsResponse {
        date,
        suggested_times: scheduling::suggested_times_or_placeholder(&same_day),
    }))
}

/// `GET /api/appointments/patient/:identifier`
///
/// An identifier containing `@` is an email; anything else an id number.
pub async fn by_patient(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(identifier): Path<String>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    caller.require(Capability::PatientAppointments)?;
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ApiError::BadRequest("Identifier is required".into()));
    }

    let conn = ctx.core.open_db()?;
    let appointments = if identifier.contains('@') {
        db::list_appointments_by_email(&conn, identifier)?
    } else {
        db::list_appointments_by_id_number(&conn, identifier)?
    };
    Ok(Json(appointments))
}

/// `DELETE /api/appointments/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    caller.require(Capability::DeleteAppointment)?;
    let conn = ctx.core.open_db()?;
    if !db::delete_appointment(&conn, id)? {
        return Err(ApiError::NotFound("Appointment not found".into()));
    }

    tracing::info!(id, "Appointment deleted");
    Ok(Json(MessageResponse {
        message: "Appointment deleted successfully",
    }))
}
