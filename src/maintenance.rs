//! Operator tasks: statistics, listings, backups, JSON export and reset.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, DatabaseName, TransactionBehavior};
use serde::Serialize;

use crate::db::{self, DatabaseError};
use crate::models::{Appointment, InventoryItem, MedicalRecord};

pub const BACKUP_DIR: &str = "backups";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub appointments: i64,
    pub inventory_items: i64,
    pub medical_records: i64,
    pub users: i64,
    /// `SUM(quantity * price)` across inventory.
    pub total_inventory_value: f64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Appointments:          {}", self.appointments)?;
        writeln!(f, "Inventory items:       {}", self.inventory_items)?;
        writeln!(f, "Medical records:       {}", self.medical_records)?;
        writeln!(f, "Users:                 {}", self.users)?;
        write!(f, "Total inventory value: {:.2}", self.total_inventory_value)
    }
}

pub fn fetch_stats(conn: &Connection) -> Result<DatabaseStats, DatabaseError> {
    Ok(DatabaseStats {
        appointments: db::count_appointments(conn)?,
        inventory_items: db::count_inventory(conn)?,
        medical_records: db::count_medical_records(conn)?,
        users: db::count_users(conn)?,
        total_inventory_value: db::total_inventory_value(conn)?,
    })
}

/// Default backup location: `backups/` next to the database file.
pub fn default_backup_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .map(|p| p.join(BACKUP_DIR))
        .unwrap_or_else(|| PathBuf::from(BACKUP_DIR))
}

#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Export serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

fn ensure_dir(dir: &Path) -> Result<(), MaintenanceError> {
    std::fs::create_dir_all(dir).map_err(|source| MaintenanceError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Copy the live database into `dir/backup-<timestamp>.db` with SQLite's
/// online backup API. Returns the written path.
pub fn backup_database(conn: &Connection, dir: &Path) -> Result<PathBuf, MaintenanceError> {
    ensure_dir(dir)?;

    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3fZ");
    let target = dir.join(format!("backup-{stamp}.db"));
    conn.backup(DatabaseName::Main, &target, None)
        .map_err(DatabaseError::from)?;

    tracing::info!(path = %target.display(), "Database backup written");
    Ok(target)
}

// ═══════════════════════════════════════════════════════════
// Export
// ═══════════════════════════════════════════════════════════

/// Full dump of the clinical tables. Users are not exported.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub appointments: Vec<Appointment>,
    pub inventory: Vec<InventoryItem>,
    pub medical_records: Vec<MedicalRecord>,
    pub exported_at: String,
}

pub fn export_data(conn: &Connection) -> Result<DataExport, DatabaseError> {
    Ok(DataExport {
        appointments: db::list_appointments(conn)?,
        inventory: db::list_inventory(conn)?,
        medical_records: db::list_medical_records(conn)?,
        exported_at: chrono::Utc::now().to_rfc3339(),
    })
}

/// Write `dir/export-<unix millis>.json`. Returns the written path.
pub fn write_export(conn: &Connection, dir: &Path) -> Result<PathBuf, MaintenanceError> {
    ensure_dir(dir)?;
    let data = export_data(conn)?;
    let json = serde_json::to_string_pretty(&data)?;

    let target = dir.join(format!("export-{}.json", chrono::Utc::now().timestamp_millis()));
    std::fs::write(&target, json).map_err(|source| MaintenanceError::Write {
        path: target.clone(),
        source,
    })?;

    tracing::info!(
        path = %target.display(),
        appointments = data.appointments.len(),
        inventory = data.inventory.len(),
        medical_records = data.medical_records.len(),
        "Data export written"
    );
    Ok(target)
}

/// Directory holding the database file; exports land next to it.
pub fn default_export_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

// ═══════════════════════════════════════════════════════════
// Reset
// ═══════════════════════════════════════════════════════════

/// Answer an operator must type to confirm a reset.
pub const RESET_CONFIRMATION: &str = "CONFIRM";

/// Rows removed by [`reset_database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSummary {
    pub appointments: usize,
    pub inventory_items: usize,
    pub medical_records: usize,
}

/// Delete every record, appointment and inventory item and restart their
/// id counters. User accounts survive.
pub fn reset_database(conn: &mut Connection) -> Result<ResetSummary, DatabaseError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let medical_records = tx.execute("DELETE FROM medical_records", [])?;
    let appointments = tx.execute("DELETE FROM appointments", [])?;
    let inventory_items = tx.execute("DELETE FROM inventory", [])?;
    tx.execute(
        "DELETE FROM sqlite_sequence
         WHERE name IN ('medical_records', 'appointments', 'inventory')",
        [],
    )?;
    tx.commit()?;

    let summary = ResetSummary {
        appointments,
        inventory_items,
        medical_records,
    };
    tracing::warn!(?summary, "Database reset");
    Ok(summary)
}

// ═══════════════════════════════════════════════════════════
// Listings
// ═══════════════════════════════════════════════════════════

fn render_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}", width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut lines = vec![
        render_row(headers, &widths),
        render_row(&rule.iter().map(String::as_str).collect::<Vec<_>>(), &widths),
    ];
    for row in rows {
        lines.push(render_row(&row.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    }
    lines.join("\n")
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

pub fn appointments_table(appointments: &[Appointment]) -> String {
    let rows: Vec<Vec<String>> = appointments
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.date.to_string(),
                a.time.clone(),
                a.client_name.clone(),
                or_dash(&a.email),
                or_dash(&a.id_number),
                a.service.clone(),
            ]
        })
        .collect();
    render_table(
        &["ID", "DATE", "TIME", "CLIENT", "EMAIL", "ID NUMBER", "SERVICE"],
        &rows,
    )
}

pub fn inventory_table(items: &[InventoryItem]) -> String {
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|i| {
            vec![
                i.id.to_string(),
                i.name.clone(),
                or_dash(&i.dosage),
                or_dash(&i.unit),
                i.quantity.to_string(),
                format!("{:.2}", i.price),
            ]
        })
        .collect();
    render_table(&["ID", "NAME", "DOSAGE", "UNIT", "QUANTITY", "PRICE"], &rows)
}

/// Records are listed by id, patient, diagnosis and creation time only.
pub fn records_table(records: &[MedicalRecord]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.patient_name.clone(),
                r.diagnosis.clone(),
                r.created_at.clone(),
            ]
        })
        .collect();
    render_table(&["ID", "PATIENT", "DIAGNOSIS", "CREATED"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{InventoryFields, MedicalRecordFields, NewAppointment, Role};

    fn seed(conn: &Connection) {
        db::insert_appointment(
            conn,
            &NewAppointment {
                date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                time: "09:00".into(),
                client_name: "John Doe".into(),
                email: Some("patient@email.com".into()),
                id_number: None,
                service: "Consultation".into(),
            },
        )
        .unwrap();
        db::insert_inventory_item(
            conn,
            &InventoryFields {
                name: "Paracetamol".into(),
                dosage: Some("500".into()),
                unit: Some("mg".into()),
                quantity: 10,
                price: 1.5,
            },
        )
        .unwrap();
        db::insert_medical_record(
            conn,
            &MedicalRecordFields {
                patient_name: "John Doe".into(),
                symptoms: "Fever".into(),
                diagnosis: "Flu".into(),
                treatment: "Rest".into(),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn stats_count_rows_and_value() {
        let conn = db::open_memory_database().unwrap();
        for (name, quantity, price) in [("A", 10, 1.5), ("B", 4, 2.0)] {
            db::insert_inventory_item(
                &conn,
                &InventoryFields {
                    name: name.into(),
                    dosage: None,
                    unit: None,
                    quantity,
                    price,
                },
            )
            .unwrap();
        }
        db::insert_user(&conn, "a@email.com", "hash", Role::Admin, "A").unwrap();

        let stats = fetch_stats(&conn).unwrap();
        assert_eq!(stats.inventory_items, 2);
        assert_eq!(stats.users, 1);
        assert_eq!(stats.appointments, 0);
        assert!((stats.total_inventory_value - 23.0).abs() < f64::EPSILON);
        assert!(stats.to_string().contains("Total inventory value: 23.00"));
    }

    #[test]
    fn backup_copies_database() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::open_database(&dir.path().join("clinic.db")).unwrap();
        db::insert_user(&conn, "a@email.com", "hash", Role::Nurse, "A").unwrap();

        let backup_dir = default_backup_dir(&dir.path().join("clinic.db"));
        let path = backup_database(&conn, &backup_dir).unwrap();
        assert!(path.starts_with(&backup_dir));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("backup-"));

        let copy = db::open_database(&path).unwrap();
        assert_eq!(db::count_users(&copy).unwrap(), 1);
    }

    #[test]
    fn default_backup_dir_sits_next_to_database() {
        assert_eq!(
            default_backup_dir(Path::new("/data/clinic.db")),
            PathBuf::from("/data/backups")
        );
    }

    #[test]
    fn export_dumps_clinical_tables() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::open_database(&dir.path().join("clinic.db")).unwrap();
        seed(&conn);

        let path = write_export(&conn, dir.path()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("export-"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["appointments"].as_array().unwrap().len(), 1);
        assert_eq!(json["inventory"][0]["name"], "Paracetamol");
        assert_eq!(json["medicalRecords"][0]["diagnosis"], "Flu");
        assert!(json["exportedAt"].is_string());
        assert!(json.get("users").is_none());
    }

    #[test]
    fn reset_clears_clinical_data_and_restarts_ids() {
        let mut conn = db::open_memory_database().unwrap();
        db::insert_user(&conn, "a@email.com", "hash", Role::Admin, "A").unwrap();
        seed(&conn);
        seed(&conn);

        let summary = reset_database(&mut conn).unwrap();
        assert_eq!(
            summary,
            ResetSummary {
                appointments: 2,
                inventory_items: 2,
                medical_records: 2,
            }
        );

        let stats = fetch_stats(&conn).unwrap();
        assert_eq!(stats.appointments, 0);
        assert_eq!(stats.inventory_items, 0);
        assert_eq!(stats.medical_records, 0);
        assert_eq!(stats.users, 1);

        seed(&conn);
        assert_eq!(db::list_inventory(&conn).unwrap()[0].id, 1);
        assert_eq!(db::list_medical_records(&conn).unwrap()[0].id, 1);
    }

    #[test]
    fn listings_render_rows() {
        let conn = db::open_memory_database().unwrap();
        seed(&conn);

        let appointments = appointments_table(&db::list_appointments(&conn).unwrap());
        let mut lines = appointments.lines();
        assert!(lines.next().unwrap().starts_with("ID  DATE"));
        assert!(lines.next().unwrap().starts_with("--"));
        let row = lines.next().unwrap();
        assert!(row.contains("2024-01-10") && row.contains("John Doe") && row.contains("Consultation"));

        let inventory = inventory_table(&db::list_inventory(&conn).unwrap());
        assert!(inventory.contains("Paracetamol") && inventory.contains("1.50"));
        assert!(inventory.contains("mg"));

        let records = records_table(&db::list_medical_records(&conn).unwrap());
        assert!(records.contains("Flu"));
        assert!(!records.contains("Fever"));
    }

    #[test]
    fn default_export_dir_is_database_directory() {
        assert_eq!(
            default_export_dir(Path::new("/data/clinic.db")),
            PathBuf::from("/data")
        );
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(inventory_table(&[]), "(no rows)");
    }
}
