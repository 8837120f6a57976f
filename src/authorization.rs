//! Role-based access control.
//!
//! Every protected route names one `Capability`; the capability decides
//! which roles may call it. Patients additionally only see medical
//! records that `patient_owns_record` attributes to them.

use crate::models::{MedicalRecord, Role};

// ═══════════════════════════════════════════════════════════
// Capability table
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ListAppointments,
    CreateAppointment,
    DeleteAppointment,
    SuggestSlots,
    PatientAppointments,
    ListInventory,
    ManageInventory,
    ReadMedicalRecords,
    SearchMedicalRecords,
    WriteMedicalRecords,
    DeleteMedicalRecords,
}

const STAFF: &[Role] = &[Role::Nurse, Role::Doctor, Role::Admin];
const ANYONE: &[Role] = &[Role::Nurse, Role::Doctor, Role::Admin, Role::Patient];
const FRONT_DESK: &[Role] = &[Role::Nurse, Role::Admin];
const CLINICIANS: &[Role] = &[Role::Doctor, Role::Nurse];
const RECORD_ADMINS: &[Role] = &[Role::Doctor, Role::Admin];

impl Capability {
    pub const ALL: [Capability; 11] = [
        Self::ListAppointments,
        Self::CreateAppointment,
        Self::DeleteAppointment,
        Self::SuggestSlots,
        Self::PatientAppointments,
        Self::ListInventory,
        Self::ManageInventory,
        Self::ReadMedicalRecords,
        Self::SearchMedicalRecords,
        Self::WriteMedicalRecords,
        Self::DeleteMedicalRecords,
    ];

    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::ListAppointments => STAFF,
            Self::CreateAppointment => FRONT_DESK,
            Self::DeleteAppointment => FRONT_DESK,
            Self::SuggestSlots => STAFF,
            Self::PatientAppointments => ANYONE,
            Self::ListInventory => STAFF,
            Self::ManageInventory => FRONT_DESK,
            Self::ReadMedicalRecords => ANYONE,
            Self::SearchMedicalRecords => STAFF,
            Self::WriteMedicalRecords => CLINICIANS,
            Self::DeleteMedicalRecords => RECORD_ADMINS,
        }
    }

    /// Route(s) guarded by this capability, for logs and error bodies.
    pub fn route(self) -> &'static str {
        match self {
            Self::ListAppointments => "GET /api/appointments",
            Self::CreateAppointment => "POST /api/appointments",
            Self::DeleteAppointment => "DELETE /api/appointments/:id",
            Self::SuggestSlots => "GET /api/appointments/available-slots",
            Self::PatientAppointments => "GET /api/appointments/patient/:identifier",
            Self::ListInventory => "GET /api/inventory",
            Self::ManageInventory => "POST/PUT/DELETE /api/inventory",
            Self::ReadMedicalRecords => "GET /api/medical-records",
            Self::SearchMedicalRecords => "GET /api/medical-records/search/:name",
            Self::WriteMedicalRecords => "POST/PUT /api/medical-records",
            Self::DeleteMedicalRecords => "DELETE /api/medical-records/:id",
        }
    }
}

pub fn is_permitted(role: Role, capability: Capability) -> bool {
    capability.allowed_roles().contains(&role)
}

// ═══════════════════════════════════════════════════════════
// Patient record ownership
// ═══════════════════════════════════════════════════════════

/// Whether a patient account may see `record`.
///
/// Weak binding: the record's email equals the account email, or the
/// record's patient name contains the account name (case-insensitive).
/// A blank account email or name never matches.
pub fn patient_owns_record(email: &str, name: &str, record: &MedicalRecord) -> bool {
    let email = email.trim();
    if !email.is_empty() && record.email.as_deref().map(str::trim) == Some(email) {
        return true;
    }

    let name = name.trim().to_lowercase();
    !name.is_empty() && record.patient_name.to_lowercase().contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(patient_name: &str, email: Option<&str>) -> MedicalRecord {
        MedicalRecord {
            id: 1,
            appointment_id: None,
            patient_name: patient_name.into(),
            email: email.map(Into::into),
            id_number: None,
            age: None,
            gender: None,
            symptoms: "Cough".into(),
            diagnosis: "Cold".into(),
            treatment: "Rest".into(),
            medications: None,
            prescribed_medicines: vec![],
            allergies: None,
            blood_pressure: None,
            heart_rate: None,
            temperature: None,
            notes: None,
            follow_up_date: None,
            lab_results: None,
            xray_notes: None,
            created_at: "2024-01-10T09:00:00+00:00".into(),
            updated_at: None,
        }
    }

    #[test]
    fn appointment_capabilities() {
        assert!(is_permitted(Role::Doctor, Capability::ListAppointments));
        assert!(!is_permitted(Role::Patient, Capability::ListAppointments));
        assert!(is_permitted(Role::Nurse, Capability::CreateAppointment));
        assert!(!is_permitted(Role::Doctor, Capability::CreateAppointment));
        assert!(!is_permitted(Role::Doctor, Capability::DeleteAppointment));
        assert!(is_permitted(Role::Patient, Capability::PatientAppointments));
    }

    #[test]
    fn inventory_capabilities() {
        assert!(is_permitted(Role::Doctor, Capability::ListInventory));
        assert!(!is_permitted(Role::Doctor, Capability::ManageInventory));
        assert!(is_permitted(Role::Admin, Capability::ManageInventory));
        assert!(!is_permitted(Role::Patient, Capability::ListInventory));
    }

    #[test]
    fn medical_record_capabilities() {
        assert!(is_permitted(Role::Patient, Capability::ReadMedicalRecords));
        assert!(!is_permitted(Role::Patient, Capability::SearchMedicalRecords));
        assert!(is_permitted(Role::Nurse, Capability::WriteMedicalRecords));
        assert!(!is_permitted(Role::Admin, Capability::WriteMedicalRecords));
        assert!(is_permitted(Role::Admin, Capability::DeleteMedicalRecords));
        assert!(!is_permitted(Role::Nurse, Capability::DeleteMedicalRecords));
    }

    #[test]
    fn patient_is_never_allowed_to_mutate() {
        for cap in Capability::ALL {
            let mutating = matches!(
                cap,
                Capability::CreateAppointment
                    | Capability::DeleteAppointment
                    | Capability::ManageInventory
                    | Capability::WriteMedicalRecords
                    | Capability::DeleteMedicalRecords
            );
            if mutating {
                assert!(!is_permitted(Role::Patient, cap), "{cap:?}");
            }
        }
    }

    #[test]
    fn every_capability_names_a_route() {
        for cap in Capability::ALL {
            assert!(cap.route().contains("/api/"));
            assert!(!cap.allowed_roles().is_empty());
        }
    }

    #[test]
    fn owner_by_email() {
        let r = record("Someone Else", Some("patient@email.com"));
        assert!(patient_owns_record("patient@email.com", "John Doe", &r));
    }

    #[test]
    fn owner_by_name_case_insensitive() {
        let r = record("Mr. JOHN DOE Jr.", None);
        assert!(patient_owns_record("patient@email.com", "John Doe", &r));
    }

    #[test]
    fn stranger_is_not_owner() {
        let r = record("Jane Roe", Some("jane@email.com"));
        assert!(!patient_owns_record("patient@email.com", "John Doe", &r));
    }

    #[test]
    fn blank_identity_matches_nothing() {
        let r = record("Jane Roe", None);
        assert!(!patient_owns_record("", "", &r));
        assert!(!patient_owns_record("  ", "  ", &r));
    }
}
