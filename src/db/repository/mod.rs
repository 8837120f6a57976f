//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection` so callers decide the
//! scope: a plain per-request connection, or a `Transaction` (which
//! derefs to `Connection`) when several writes must land together.

mod appointment;
mod inventory;
mod medical_record;
mod user;

pub use appointment::*;
pub use inventory::*;
pub use medical_record::*;
pub use user::*;

/// Current timestamp in the format stored in `created_at` / `updated_at`.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
