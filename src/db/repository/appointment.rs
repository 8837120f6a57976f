use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::now_timestamp;
use crate::db::DatabaseError;
use crate::models::{Appointment, NewAppointment};

const APPOINTMENT_COLUMNS: &str =
    "id, date, time, client_name, email, id_number, service, created_at";

pub fn insert_appointment(
    conn: &Connection,
    new: &NewAppointment,
) -> Result<Appointment, DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (date, time, client_name, email, id_number, service, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.date.to_string(),
            new.time,
            new.client_name,
            new.email,
            new.id_number,
            new.service,
            now_timestamp(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_appointment(conn, id)?.ok_or_else(|| DatabaseError::not_found("appointment", id))
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id],
            appointment_row_from_rusqlite,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// All appointments, most recent first.
pub fn list_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY date DESC, time DESC"),
        [],
    )
}

/// Appointments sharing a date key, in chronological order. This is the
/// scan order the conflict checker relies on.
pub fn list_appointments_on_date(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE date = ?1 ORDER BY time ASC, id ASC"
        ),
        params![date.to_string()],
    )
}

pub fn list_appointments_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE email = ?1 ORDER BY date DESC, time DESC"
        ),
        params![email],
    )
}

pub fn list_appointments_by_id_number(
    conn: &Connection,
    id_number: &str,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id_number = ?1 ORDER BY date DESC, time DESC"
        ),
        params![id_number],
    )
}

/// Returns `false` when no row had that id.
pub fn delete_appointment(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?)
}

fn query_appointments<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, appointment_row_from_rusqlite)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

// Internal row type for Appointment mapping
struct AppointmentRow {
    id: i64,
    date: String,
    time: String,
    client_name: String,
    email: Option<String>,
    id_number: Option<String>,
    service: String,
    created_at: String,
}

fn appointment_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        date: row.get(1)?,
        time: row.get(2)?,
        client_name: row.get(3)?,
        email: row.get(4)?,
        id_number: row.get(5)?,
        service: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
        DatabaseError::CorruptedColumn {
            column: "appointments.date".into(),
            reason: format!("{}: {e}", row.date),
        }
    })?;
    Ok(Appointment {
        id: row.id,
        date,
        time: row.time,
        client_name: row.client_name,
        email: row.email,
        id_number: row.id_number,
        service: row.service,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn new_appointment(date: &str, time: &str, client: &str) -> NewAppointment {
        NewAppointment {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: time.into(),
            client_name: client.into(),
            email: Some(format!("{}@example.com", client.to_lowercase())),
            id_number: Some(format!("ID-{client}")),
            service: "General consultation".into(),
        }
    }

    #[test]
    fn insert_returns_stored_appointment() {
        let conn = open_memory_database().unwrap();
        let created = insert_appointment(&conn, &new_appointment("2024-01-10", "09:00", "Ana")).unwrap();

        assert!(created.id > 0);
        assert_eq!(created.date.to_string(), "2024-01-10");
        assert_eq!(created.time, "09:00");
        assert_eq!(created.client_name, "Ana");
        assert_eq!(created.email.as_deref(), Some("ana@example.com"));
        assert!(!created.created_at.is_empty());

        let fetched = get_appointment(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn same_date_listing_is_chronological() {
        let conn = open_memory_database().unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-10", "11:00", "B")).unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-10", "09:00", "A")).unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-11", "08:00", "C")).unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let on_date = list_appointments_on_date(&conn, date).unwrap();
        let times: Vec<&str> = on_date.iter().map(|a| a.time.as_str()).collect();
        assert_eq!(times, vec!["09:00", "11:00"]);
    }

    #[test]
    fn full_listing_is_most_recent_first() {
        let conn = open_memory_database().unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-10", "09:00", "A")).unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-11", "08:00", "B")).unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-10", "15:00", "C")).unwrap();

        let all = list_appointments(&conn).unwrap();
        let clients: Vec<&str> = all.iter().map(|a| a.client_name.as_str()).collect();
        assert_eq!(clients, vec!["B", "C", "A"]);
    }

    #[test]
    fn lookup_by_patient_identifiers() {
        let conn = open_memory_database().unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-10", "09:00", "Ana")).unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-12", "10:00", "Ana")).unwrap();
        insert_appointment(&conn, &new_appointment("2024-01-10", "13:00", "Ben")).unwrap();

        assert_eq!(list_appointments_by_email(&conn, "ana@example.com").unwrap().len(), 2);
        assert_eq!(list_appointments_by_id_number(&conn, "ID-Ben").unwrap().len(), 1);
        assert!(list_appointments_by_email(&conn, "nobody@example.com").unwrap().is_empty());
    }

    #[test]
    fn delete_reports_missing_rows() {
        let conn = open_memory_database().unwrap();
        let created = insert_appointment(&conn, &new_appointment("2024-01-10", "09:00", "Ana")).unwrap();

        assert!(delete_appointment(&conn, created.id).unwrap());
        assert!(!delete_appointment(&conn, created.id).unwrap());
        assert_eq!(count_appointments(&conn).unwrap(), 0);
    }
}
