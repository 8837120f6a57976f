use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{Role, User};

pub fn insert_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    role: Role,
    name: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (email, password_hash, role, name) VALUES (?1, ?2, ?3, ?4)",
        params![email, password_hash, role.as_str(), name],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(format!("email already registered: {email}"))
        }
        other => DatabaseError::Sqlite(other),
    })?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, email, role, name FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, email, role, name)| {
        Ok(User {
            id,
            email,
            role: Role::from_str(&role)?,
            name,
        })
    })
    .transpose()
}

/// Look up a user by email together with the stored password hash.
/// Email comparison is exact, matching the UNIQUE constraint.
pub fn get_user_credentials(
    conn: &Connection,
    email: &str,
) -> Result<Option<(User, String)>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, email, role, name, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, email, role, name, hash)| {
        Ok((
            User {
                id,
                email,
                role: Role::from_str(&role)?,
                name,
            },
            hash,
        ))
    })
    .transpose()
}

pub fn count_users(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn insert_and_fetch_user() {
        let conn = open_memory_database().unwrap();
        let id = insert_user(&conn, "nurse@email.com", "hash", Role::Nurse, "Nurse Joy").unwrap();

        let user = get_user(&conn, id).unwrap().unwrap();
        assert_eq!(user.email, "nurse@email.com");
        assert_eq!(user.role, Role::Nurse);
        assert_eq!(user.name, "Nurse Joy");
    }

    #[test]
    fn credentials_include_hash() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, "doctor@email.com", "stored-hash", Role::Doctor, "Dr. Grey").unwrap();

        let (user, hash) = get_user_credentials(&conn, "doctor@email.com").unwrap().unwrap();
        assert_eq!(user.role, Role::Doctor);
        assert_eq!(hash, "stored-hash");
        assert!(get_user_credentials(&conn, "nobody@email.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_constraint_violation() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, "admin@email.com", "h", Role::Admin, "Admin").unwrap();
        let err = insert_user(&conn, "admin@email.com", "h", Role::Admin, "Admin 2").unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
        assert_eq!(count_users(&conn).unwrap(), 1);
    }
}
