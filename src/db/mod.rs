pub mod conflict;
pub mod repository;
pub mod sqlite;

pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

/// Decode a `UNIQUE constraint failed: table.column` error into the
/// violated `table.column` pair.
///
/// The unique indexes in the schema are the authoritative duplicate
/// detector (the service-layer pre-checks are only a fast path), so the
/// service layer uses this to turn a constraint failure from a losing
/// concurrent writer into the same duplicate error the pre-check would
/// have produced.
pub fn unique_violation(err: &rusqlite::Error) -> Option<String> {
    if let rusqlite::Error::SqliteFailure(e, Some(msg)) = err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            if let Some(rest) = msg.strip_prefix("UNIQUE constraint failed:") {
                return Some(rest.trim().to_string());
            }
        }
    }
    None
}
