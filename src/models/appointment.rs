use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub date: NaiveDate,
    /// `HH:MM`, zero-padded.
    pub time: String,
    pub client_name: String,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub service: String,
    pub created_at: String,
}

/// Validated input for a new appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub date: NaiveDate,
    pub time: String,
    pub client_name: String,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub service: String,
}
