//! Conflict detection — the shared "does a record matching this
//! predicate already exist, excluding the record itself" primitive.
//!
//! Every uniqueness decision in the crate (identity fields, the daily
//! mood singleton) routes through this module so the check-then-act
//! story stays in one place. These checks are a fast path for friendly
//! errors only: the unique indexes in the schema remain the system of
//! record, and a constraint failure on write is the authoritative
//! duplicate signal.

use chrono::NaiveDate;
use rusqlite::{Connection, ToSql};
use serde::Serialize;
use uuid::Uuid;

use super::DatabaseError;

/// Kind of record a uniqueness check runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Patient,
    Professional,
}

impl RecordKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Patient => "patients",
            Self::Professional => "professionals",
        }
    }
}

/// Identity fields required to be globally unique, listed in the fixed
/// priority order duplicate reports use: national id, then email, then
/// license id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    NationalId,
    Email,
    LicenseId,
}

impl IdentityField {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::NationalId => "national_id",
            Self::Email => "email",
            Self::LicenseId => "license_id",
        }
    }

    /// Decode the `table.column` pair from a unique-index failure.
    pub(crate) fn from_violation(violation: &str) -> Option<Self> {
        match violation.rsplit('.').next()? {
            "national_id" => Some(Self::NationalId),
            "email" => Some(Self::Email),
            "license_id" => Some(Self::LicenseId),
            _ => None,
        }
    }
}

impl std::fmt::Display for IdentityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NationalId => "national id",
            Self::Email => "email",
            Self::LicenseId => "license id",
        };
        f.write_str(label)
    }
}

/// Is `value` already taken for `field` on any record of `kind` other
/// than `exclude`?
pub fn identity_in_use(
    conn: &Connection,
    kind: RecordKind,
    field: IdentityField,
    value: &str,
    exclude: Option<Uuid>,
) -> Result<bool, DatabaseError> {
    debug_assert!(
        !(kind == RecordKind::Patient && field == IdentityField::LicenseId),
        "patients carry no license id"
    );
    exists_excluding(conn, kind.table(), field.column(), value, exclude)
}

/// Has `patient_id` already recorded a mood on `date`?
pub fn mood_recorded_on(
    conn: &Connection,
    patient_id: Uuid,
    date: NaiveDate,
) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM mood_entries WHERE patient_id = ?1 AND entry_date = ?2)",
        rusqlite::params![patient_id.to_string(), date],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn exists_excluding<T: ToSql>(
    conn: &Connection,
    table: &'static str,
    column: &'static str,
    value: T,
    exclude: Option<Uuid>,
) -> Result<bool, DatabaseError> {
    // table and column come from the enums above, never from input.
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE {column} = ?1 AND (?2 IS NULL OR id <> ?2))"
    );
    let exists: bool = conn.query_row(
        &sql,
        rusqlite::params![value, exclude.map(|id| id.to_string())],
        |row| row.get(0),
    )?;
    Ok(exists)
}
