//! Medical record endpoints.
//!
//! - `GET /api/medical-records`: staff see all, patients their own
//! - `GET /api/medical-records/:id`
//! - `GET /api/medical-records/search/:name`
//! - `POST /api/medical-records`: refuses duplicate patient identity,
//!   dispenses prescribed stock
//! - `PUT /api/medical-records/:id`: dispenses or returns the net change
//! - `DELETE /api/medical-records/:id`: stock is not returned
//!
//! Writes run the record change and the stock change in one IMMEDIATE
//! transaction.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Deserializer, Serialize};

use super::{missing_fields, non_blank, MessageResponse};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::authorization::{patient_owns_record, Capability};
use crate::db::{self, DatabaseError};
use crate::models::{MedicalRecord, MedicalRecordFields, PrescribedMedicine, RecordSummary, Role};
use crate::prescriptions::{self, InventoryUpdate};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordRequest {
    pub appointment_id: Option<i64>,
    pub patient_name: Option<String>,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub medications: Option<String>,
    #[serde(default)]
    pub prescribed_medicines: Vec<PrescribedMedicine>,
    pub allergies: Option<String>,
    pub blood_pressure: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub heart_rate: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub temperature: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<String>,
    pub lab_results: Option<String>,
    pub xray_notes: Option<String>,
}

/// Vitals arrive as either `"72"` or `72`; both are stored as text.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(|v| match v {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Number(n) => n.to_string(),
    }))
}

impl MedicalRecordRequest {
    fn into_fields(self) -> Result<MedicalRecordFields, ApiError> {
        let (patient_name, symptoms, diagnosis, treatment) = match (
            non_blank(self.patient_name),
            non_blank(self.symptoms),
            non_blank(self.diagnosis),
            non_blank(self.treatment),
        ) {
            (Some(patient_name), Some(symptoms), Some(diagnosis), Some(treatment)) => {
                (patient_name, symptoms, diagnosis, treatment)
            }
            (patient_name, symptoms, diagnosis, treatment) => {
                return Err(missing_fields(&[
                    ("patientName", patient_name.is_none()),
                    ("symptoms", symptoms.is_none()),
                    ("diagnosis", diagnosis.is_none()),
                    ("treatment", treatment.is_none()),
                ]));
            }
        };
        if self.age.is_some_and(|age| age < 0) {
            return Err(ApiError::BadRequest("Age must be non-negative".into()));
        }

        Ok(MedicalRecordFields {
            appointment_id: self.appointment_id,
            patient_name,
            email: non_blank(self.email),
            id_number: non_blank(self.id_number),
            age: self.age,
            gender: non_blank(self.gender),
            symptoms,
            diagnosis,
            treatment,
            medications: non_blank(self.medications),
            prescribed_medicines: self.prescribed_medicines,
            allergies: non_blank(self.allergies),
            blood_pressure: non_blank(self.blood_pressure),
            heart_rate: non_blank(self.heart_rate),
            temperature: non_blank(self.temperature),
            notes: non_blank(self.notes),
            follow_up_date: non_blank(self.follow_up_date),
            lab_results: non_blank(self.lab_results),
            xray_notes: non_blank(self.xray_notes),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordWriteResponse {
    pub record: MedicalRecord,
    pub inventory_updates: Vec<InventoryUpdate>,
}

fn record_not_found() -> ApiError {
    ApiError::NotFound("Medical record not found".into())
}

/// Fill missing display names in a prescription from inventory.
fn snapshot_names(
    conn: &Connection,
    prescribed: &mut [PrescribedMedicine],
    updates: &[InventoryUpdate],
) -> Result<(), DatabaseError> {
    let known: HashMap<i64, &str> = updates.iter().map(|u| (u.id, u.name.as_str())).collect();
    for medicine in prescribed.iter_mut().filter(|m| m.name.is_none()) {
        medicine.name = match known.get(&medicine.id) {
            Some(name) => Some((*name).to_string()),
            None => db::get_inventory_item(conn, medicine.id)?.map(|item| item.name),
        };
    }
    Ok(())
}

/// `GET /api/medical-records`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
) -> Result<Json<Vec<MedicalRecord>>, ApiError> {
    caller.require(Capability::ReadMedicalRecords)?;
    let conn = ctx.core.open_db()?;
    let mut records = db::list_medical_records(&conn)?;

    if caller.role() == Role::Patient {
        records.retain(|r| patient_owns_record(&caller.user.email, &caller.user.name, r));
    }
    Ok(Json(records))
}

/// `GET /api/medical-records/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(id): Path<i64>,
) -> Result<Json<MedicalRecord>, ApiError> {
    caller.require(Capability::ReadMedicalRecords)?;
    let conn = ctx.core.open_db()?;
    let record = db::get_medical_record(&conn, id)?.ok_or_else(record_not_found)?;

    if caller.role() == Role::Patient
        && !patient_owns_record(&caller.user.email, &caller.user.name, &record)
    {
        tracing::warn!(id, email = %caller.user.email, "Patient denied foreign record");
        return Err(ApiError::RecordAccessDenied);
    }
    Ok(Json(record))
}

/// `GET /api/medical-records/search/:name`
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(name): Path<String>,
) -> Result<Json<Vec<MedicalRecord>>, ApiError> {
    caller.require(Capability::SearchMedicalRecords)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(db::search_medical_records(&conn, name.trim())?))
}

/// `POST /api/medical-records`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Json(request): Json<MedicalRecordRequest>,
) -> Result<(StatusCode, Json<RecordWriteResponse>), ApiError> {
    caller.require(Capability::WriteMedicalRecords)?;
    let mut fields = request.into_fields()?;

    let mut conn = ctx.core.open_db()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if let Some(existing) =
        db::find_duplicate_record(&tx, fields.id_number.as_deref(), fields.email.as_deref())?
    {
        tracing::info!(existing_id = existing.id, "Duplicate patient identity");
        return Err(ApiError::DuplicateRecord(Box::new(RecordSummary::from(&existing))));
    }
    if let Some(appointment_id) = fields.appointment_id {
        if db::get_appointment(&tx, appointment_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Appointment {appointment_id} not found"
            )));
        }
    }

    let updates = prescriptions::plan_create(&*tx, &fields.prescribed_medicines)?;
    prescriptions::apply(&*tx, &updates)?;
    snapshot_names(&tx, &mut fields.prescribed_medicines, &updates)?;
    let record = db::insert_medical_record(&tx, &fields)?;
    tx.commit()?;

    tracing::info!(
        id = record.id,
        by = %caller.user.email,
        dispensed = updates.len(),
        "Medical record created"
    );
    Ok((
        StatusCode::CREATED,
        Json(RecordWriteResponse {
            record,
            inventory_updates: updates,
        }),
    ))
}

/// `PUT /api/medical-records/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(id): Path<i64>,
    Json(request): Json<MedicalRecordRequest>,
) -> Result<Json<RecordWriteResponse>, ApiError> {
    caller.require(Capability::WriteMedicalRecords)?;
    let mut fields = request.into_fields()?;

    let mut conn = ctx.core.open_db()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = db::get_medical_record(&tx, id)?.ok_or_else(record_not_found)?;
    let updates = prescriptions::plan_update(
        &*tx,
        &existing.prescribed_medicines,
        &fields.prescribed_medicines,
    )?;
    prescriptions::apply(&*tx, &updates)?;
    snapshot_names(&tx, &mut fields.prescribed_medicines, &updates)?;

    if !db::update_medical_record(&tx, id, &fields)? {
        return Err(record_not_found());
    }
    let record = db::get_medical_record(&tx, id)?.ok_or_else(record_not_found)?;
    tx.commit()?;

    tracing::info!(id, by = %caller.user.email, stock_changes = updates.len(), "Medical record updated");
    Ok(Json(RecordWriteResponse {
        record,
        inventory_updates: updates,
    }))
}

/// `DELETE /api/medical-records/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    caller.require(Capability::DeleteMedicalRecords)?;
    let conn = ctx.core.open_db()?;
    if !db::delete_medical_record(&conn, id)? {
        return Err(record_not_found());
    }

    tracing::info!(id, by = %caller.user.email, "Medical record deleted");
    Ok(Json(MessageResponse {
        message: "Medical record deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_fields_are_named() {
        let err = MedicalRecordRequest {
            patient_name: Some("John".into()),
            symptoms: Some(" ".into()),
            ..Default::default()
        }
        .into_fields()
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid request: Missing required fields: symptoms, diagnosis, treatment"
        );
    }

    #[test]
    fn vitals_accept_numbers() {
        let req: MedicalRecordRequest = serde_json::from_value(serde_json::json!({
            "patientName": "John",
            "heartRate": 72,
            "temperature": "36.6"
        }))
        .unwrap();
        assert_eq!(req.heart_rate.as_deref(), Some("72"));
        assert_eq!(req.temperature.as_deref(), Some("36.6"));
    }

    #[test]
    fn snapshot_names_fills_from_inventory() {
        let conn = db::open_memory_database().unwrap();
        let item = db::insert_inventory_item(
            &conn,
            &crate::models::InventoryFields {
                name: "Ibuprofen".into(),
                dosage: None,
                unit: None,
                quantity: 3,
                price: 1.0,
            },
        )
        .unwrap();

        let mut prescribed = vec![
            PrescribedMedicine { id: item.id, quantity: 1, name: None },
            PrescribedMedicine { id: 999, quantity: 1, name: None },
            PrescribedMedicine { id: item.id, quantity: 1, name: Some("Kept".into()) },
        ];
        snapshot_names(&conn, &mut prescribed, &[]).unwrap();
        assert_eq!(prescribed[0].name.as_deref(), Some("Ibuprofen"));
        assert_eq!(prescribed[1].name, None);
        assert_eq!(prescribed[2].name.as_deref(), Some("Kept"));
    }
}
