use serde::{Deserialize, Serialize};

/// One line of a prescription: an inventory item and how many units
/// were dispensed against it. `name` is a snapshot for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescribedMedicine {
    pub id: i64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: i64,
    pub appointment_id: Option<i64>,
    pub patient_name: String,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub symptoms: String,
    pub diagnosis: String,
    pub treatment: String,
    pub medications: Option<String>,
    pub prescribed_medicines: Vec<PrescribedMedicine>,
    pub allergies: Option<String>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<String>,
    pub temperature: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<String>,
    pub lab_results: Option<String>,
    pub xray_notes: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Writable medical record fields, shared by create and update.
#[derive(Debug, Clone, Default)]
pub struct MedicalRecordFields {
    pub appointment_id: Option<i64>,
    pub patient_name: String,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub symptoms: String,
    pub diagnosis: String,
    pub treatment: String,
    pub medications: Option<String>,
    pub prescribed_medicines: Vec<PrescribedMedicine>,
    pub allergies: Option<String>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<String>,
    pub temperature: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<String>,
    pub lab_results: Option<String>,
    pub xray_notes: Option<String>,
}

/// What a duplicate-identity conflict shows the caller about the
/// record that already exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: i64,
    pub patient_name: String,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub diagnosis: String,
    pub created_at: String,
}

impl From<&MedicalRecord> for RecordSummary {
    fn from(record: &MedicalRecord) -> Self {
        Self {
            id: record.id,
            patient_name: record.patient_name.clone(),
            email: record.email.clone(),
            id_number: record.id_number.clone(),
            diagnosis: record.diagnosis.clone(),
            created_at: record.created_at.clone(),
        }
    }
}
