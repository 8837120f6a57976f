//! Shared application state.
//!
//! `CoreState` holds what every request needs: where the database lives
//! and how to sign session tokens. Connections are opened per request
//! with `open_db`; nothing else is shared between requests.

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::crypto::{hash_password, TokenIssuer};
use crate::db;
use crate::models::Role;

/// Accounts created on first start, when the users table is empty.
pub const DEMO_USERS: &[(&str, &str, Role, &str)] = &[
    ("nurse@email.com", "nursePassword123", Role::Nurse, "Nurse Joy"),
    ("doctor@email.com", "doctorPassword123", Role::Doctor, "Dr. Smith"),
    ("admin@email.com", "adminPassword123", Role::Admin, "Clinic Admin"),
    ("patient@email.com", "patientPassword123", Role::Patient, "John Doe"),
];

pub struct CoreState {
    db_path: PathBuf,
    tokens: TokenIssuer,
}

impl CoreState {
    pub fn new(db_path: impl Into<PathBuf>, tokens: TokenIssuer) -> Self {
        Self {
            db_path: db_path.into(),
            tokens,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.db_path.clone(),
            TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl_hours),
        )
    }

    /// Open a database connection for one request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create or migrate the database and seed demo accounts.
    ///
    /// Returns the number of accounts seeded (0 once any user exists).
    pub fn initialize(&self) -> Result<usize, CoreError> {
        let conn = self.open_db()?;
        if db::count_users(&conn)? > 0 {
            return Ok(0);
        }

        let tx = conn.unchecked_transaction().map_err(db::DatabaseError::from)?;
        for (email, password, role, name) in DEMO_USERS {
            db::insert_user(&tx, email, &hash_password(password), *role, name)?;
        }
        tx.commit().map_err(db::DatabaseError::from)?;

        tracing::info!(count = DEMO_USERS.len(), "Seeded demo accounts");
        Ok(DEMO_USERS.len())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_password;

    fn state(dir: &tempfile::TempDir) -> CoreState {
        CoreState::new(dir.path().join("clinic.db"), TokenIssuer::new(b"test", 24))
    }

    #[test]
    fn initialize_seeds_demo_users_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        assert_eq!(state.initialize().unwrap(), 4);
        assert_eq!(state.initialize().unwrap(), 0);

        let conn = state.open_db().unwrap();
        assert_eq!(db::count_users(&conn).unwrap(), 4);
    }

    #[test]
    fn seeded_passwords_are_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        state.initialize().unwrap();

        let conn = state.open_db().unwrap();
        let (user, hash) = db::get_user_credentials(&conn, "doctor@email.com")
            .unwrap()
            .unwrap();
        assert_eq!(user.role, Role::Doctor);
        assert_ne!(hash, "doctorPassword123");
        assert!(verify_password("doctorPassword123", &hash).unwrap());
    }

    #[test]
    fn open_db_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        assert!(!state.db_path().exists());
        state.open_db().unwrap();
        assert!(state.db_path().exists());
    }
}
