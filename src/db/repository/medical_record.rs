use rusqlite::{params, Connection, OptionalExtension};

use super::now_timestamp;
use crate::db::DatabaseError;
use crate::models::{MedicalRecord, MedicalRecordFields, PrescribedMedicine};

const RECORD_COLUMNS: &str = "id, appointment_id, patient_name, email, id_number, age, gender,
     symptoms, diagnosis, treatment, medications, prescribed_medicines, allergies,
     blood_pressure, heart_rate, temperature, notes, follow_up_date, lab_results,
     xray_notes, created_at, updated_at";

pub fn insert_medical_record(
    conn: &Connection,
    fields: &MedicalRecordFields,
) -> Result<MedicalRecord, DatabaseError> {
    let prescribed = encode_prescription(&fields.prescribed_medicines)?;
    conn.execute(
        "INSERT INTO medical_records (
            appointment_id, patient_name, email, id_number, age, gender, symptoms, diagnosis,
            treatment, medications, prescribed_medicines, allergies, blood_pressure, heart_rate,
            temperature, notes, follow_up_date, lab_results, xray_notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            fields.appointment_id,
            fields.patient_name,
            fields.email,
            fields.id_number,
            fields.age,
            fields.gender,
            fields.symptoms,
            fields.diagnosis,
            fields.treatment,
            fields.medications,
            prescribed,
            fields.allergies,
            fields.blood_pressure,
            fields.heart_rate,
            fields.temperature,
            fields.notes,
            fields.follow_up_date,
            fields.lab_results,
            fields.xray_notes,
            now_timestamp(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_medical_record(conn, id)?.ok_or_else(|| DatabaseError::not_found("medical record", id))
}

pub fn get_medical_record(
    conn: &Connection,
    id: i64,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?1"),
            params![id],
            record_row_from_rusqlite,
        )
        .optional()?;
    row.map(record_from_row).transpose()
}

/// All records, newest first.
pub fn list_medical_records(conn: &Connection) -> Result<Vec<MedicalRecord>, DatabaseError> {
    query_records(
        conn,
        &format!("SELECT {RECORD_COLUMNS} FROM medical_records ORDER BY created_at DESC, id DESC"),
        [],
    )
}

/// Substring match on patient name (SQLite `LIKE`, ASCII case-insensitive).
/// `%` and `_` in the search text match literally.
pub fn search_medical_records(
    conn: &Connection,
    patient_name: &str,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let pattern = format!("%{}%", escape_like(patient_name));
    query_records(
        conn,
        &format!(
            "SELECT {RECORD_COLUMNS} FROM medical_records
             WHERE patient_name LIKE ?1 ESCAPE '\\' ORDER BY created_at DESC, id DESC"
        ),
        params![pattern],
    )
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Find an existing record sharing either identifier with a new patient.
///
/// Exact-string OR across `id_number` and `email`. Blank identifiers
/// never match. When the two identifiers point at different records the
/// oldest (lowest id) wins.
pub fn find_duplicate_record(
    conn: &Connection,
    id_number: Option<&str>,
    email: Option<&str>,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    let id_number = id_number.map(str::trim).filter(|s| !s.is_empty());
    let email = email.map(str::trim).filter(|s| !s.is_empty());
    if id_number.is_none() && email.is_none() {
        return Ok(None);
    }

    let row = conn
        .query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM medical_records
                 WHERE (?1 IS NOT NULL AND id_number = ?1)
                    OR (?2 IS NOT NULL AND email = ?2)
                 ORDER BY id ASC LIMIT 1"
            ),
            params![id_number, email],
            record_row_from_rusqlite,
        )
        .optional()?;
    row.map(record_from_row).transpose()
}

/// Overwrite every writable column. `appointment_id` keeps its stored
/// value; the link is fixed at creation.
pub fn update_medical_record(
    conn: &Connection,
    id: i64,
    fields: &MedicalRecordFields,
) -> Result<bool, DatabaseError> {
    let prescribed = encode_prescription(&fields.prescribed_medicines)?;
    let affected = conn.execute(
        "UPDATE medical_records
         SET patient_name = ?1, email = ?2, id_number = ?3, age = ?4, gender = ?5,
             symptoms = ?6, diagnosis = ?7, treatment = ?8, medications = ?9,
             prescribed_medicines = ?10, allergies = ?11, blood_pressure = ?12,
             heart_rate = ?13, temperature = ?14, notes = ?15, follow_up_date = ?16,
             lab_results = ?17, xray_notes = ?18, updated_at = ?19
         WHERE id = ?20",
        params![
            fields.patient_name,
            fields.email,
            fields.id_number,
            fields.age,
            fields.gender,
            fields.symptoms,
            fields.diagnosis,
            fields.treatment,
            fields.medications,
            prescribed,
            fields.allergies,
            fields.blood_pressure,
            fields.heart_rate,
            fields.temperature,
            fields.notes,
            fields.follow_up_date,
            fields.lab_results,
            fields.xray_notes,
            now_timestamp(),
            id,
        ],
    )?;
    Ok(affected > 0)
}

pub fn delete_medical_record(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM medical_records WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

pub fn count_medical_records(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM medical_records", [], |row| row.get(0))?)
}

fn encode_prescription(items: &[PrescribedMedicine]) -> Result<String, DatabaseError> {
    serde_json::to_string(items).map_err(|e| DatabaseError::CorruptedColumn {
        column: "medical_records.prescribed_medicines".into(),
        reason: e.to_string(),
    })
}

fn decode_prescription(raw: &str) -> Result<Vec<PrescribedMedicine>, DatabaseError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|e| DatabaseError::CorruptedColumn {
        column: "medical_records.prescribed_medicines".into(),
        reason: e.to_string(),
    })
}

fn query_records<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, record_row_from_rusqlite)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}

// Internal row type: everything but the prescription maps 1:1.
struct RecordRow {
    record: MedicalRecord,
    prescribed_raw: String,
}

fn record_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<RecordRow, rusqlite::Error> {
    Ok(RecordRow {
        record: MedicalRecord {
            id: row.get(0)?,
            appointment_id: row.get(1)?,
            patient_name: row.get(2)?,
            email: row.get(3)?,
            id_number: row.get(4)?,
            age: row.get(5)?,
            gender: row.get(6)?,
            symptoms: row.get(7)?,
            diagnosis: row.get(8)?,
            treatment: row.get(9)?,
            medications: row.get(10)?,
            prescribed_medicines: Vec::new(),
            allergies: row.get(12)?,
            blood_pressure: row.get(13)?,
            heart_rate: row.get(14)?,
            temperature: row.get(15)?,
            notes: row.get(16)?,
            follow_up_date: row.get(17)?,
            lab_results: row.get(18)?,
            xray_notes: row.get(19)?,
            created_at: row.get(20)?,
            updated_at: row.get(21)?,
        },
        prescribed_raw: row.get(11)?,
    })
}

fn record_from_row(row: RecordRow) -> Result<MedicalRecord, DatabaseError> {
    let mut record = row.record;
    record.prescribed_medicines = decode_prescription(&row.prescribed_raw)?;
    Ok(record)
}
