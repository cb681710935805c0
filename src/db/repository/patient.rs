//! Patient rows — mapping plus one function per statement.
//!
//! The engagement transition writes are guarded UPDATEs: the WHERE
//! clause re-asserts the state-machine precondition, so a statement
//! that affects zero rows means a concurrent transition won and the
//! caller must re-read to report the real state.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Engagement, Patient, RequestStatus};

const PATIENT_COLUMNS: &str = "id, national_id, full_name, email, password_hash, registered_at,
     linked_professional_id, request_professional_id, request_status";

struct PatientRow {
    id: String,
    national_id: String,
    full_name: String,
    email: String,
    password_hash: String,
    registered_at: NaiveDateTime,
    linked_professional_id: Option<String>,
    request_professional_id: Option<String>,
    request_status: Option<String>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        national_id: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        registered_at: row.get(5)?,
        linked_professional_id: row.get(6)?,
        request_professional_id: row.get(7)?,
        request_status: row.get(8)?,
    })
}

fn parse_id(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let linked = row
        .linked_professional_id
        .as_deref()
        .map(parse_id)
        .transpose()?;
    let request_target = row
        .request_professional_id
        .as_deref()
        .map(parse_id)
        .transpose()?;
    let request_status = row
        .request_status
        .as_deref()
        .map(RequestStatus::from_str)
        .transpose()?;

    Ok(Patient {
        id: parse_id(&row.id)?,
        national_id: row.national_id,
        full_name: row.full_name,
        email: row.email,
        password_hash: row.password_hash,
        registered_at: row.registered_at,
        engagement: Engagement::from_columns(linked, request_target, request_status),
    })
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO patients (id, national_id, full_name, email, password_hash, registered_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            patient.id.to_string(),
            patient.national_id,
            patient.full_name,
            patient.email,
            patient.password_hash,
            patient.registered_at,
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: Uuid) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![id.to_string()], read_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_patient_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE national_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![national_id], read_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY full_name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_row)?;
    rows.map(|r| patient_from_row(r?)).collect()
}

/// Partial field update; `None` leaves the column untouched. A single
/// statement, so nothing is written when a pre-check fails upstream.
pub fn update_patient_fields(
    conn: &Connection,
    id: Uuid,
    national_id: Option<&str>,
    full_name: Option<&str>,
    email: Option<&str>,
    password_hash: Option<&str>,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE patients SET
             national_id = COALESCE(?2, national_id),
             full_name = COALESCE(?3, full_name),
             email = COALESCE(?4, email),
             password_hash = COALESCE(?5, password_hash)
         WHERE id = ?1",
        params![id.to_string(), national_id, full_name, email, password_hash],
    )
}

pub fn delete_patient(conn: &Connection, id: Uuid) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

// ── Engagement transitions (guarded writes) ─────────────────────────

/// `Unlinked`/`Decided` → `Pending(target)`.
pub fn set_pending_request(
    conn: &Connection,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET request_professional_id = ?2, request_status = 'pending'
         WHERE id = ?1
           AND linked_professional_id IS NULL
           AND (request_status IS NULL OR request_status <> 'pending')",
        params![patient_id.to_string(), professional_id.to_string()],
    )?;
    Ok(affected)
}

/// `Pending` → `Unlinked`: clears both target and status.
pub fn clear_pending_request(conn: &Connection, patient_id: Uuid) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET request_professional_id = NULL, request_status = NULL
         WHERE id = ?1 AND request_status = 'pending'",
        params![patient_id.to_string()],
    )?;
    Ok(affected)
}

/// `Pending(professional)` → `Linked(professional)`, recording the
/// accepted status alongside the link.
pub fn accept_pending_request(
    conn: &Connection,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET linked_professional_id = ?2, request_status = 'accepted'
         WHERE id = ?1 AND request_professional_id = ?2 AND request_status = 'pending'",
        params![patient_id.to_string(), professional_id.to_string()],
    )?;
    Ok(affected)
}

/// `Pending(professional)` → `Decided(professional, rejected)`.
pub fn reject_pending_request(
    conn: &Connection,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET request_status = 'rejected'
         WHERE id = ?1 AND request_professional_id = ?2 AND request_status = 'pending'",
        params![patient_id.to_string(), professional_id.to_string()],
    )?;
    Ok(affected)
}

/// `Linked` → `Unlinked`, resetting any request marker as well. When
/// `from_professional` is given the link must point at that
/// professional for the write to land.
pub fn clear_link(
    conn: &Connection,
    patient_id: Uuid,
    from_professional: Option<Uuid>,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET linked_professional_id = NULL,
             request_professional_id = NULL, request_status = NULL
         WHERE id = ?1
           AND linked_professional_id IS NOT NULL
           AND (?2 IS NULL OR linked_professional_id = ?2)",
        params![
            patient_id.to_string(),
            from_professional.map(|id| id.to_string())
        ],
    )?;
    Ok(affected)
}

/// Administrative link: sets the link regardless of current state and
/// resets the request columns so the row stays representable.
pub fn force_link(
    conn: &Connection,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET linked_professional_id = ?2,
             request_professional_id = NULL, request_status = NULL
         WHERE id = ?1",
        params![patient_id.to_string(), professional_id.to_string()],
    )?;
    Ok(affected)
}

// ── Engagement queries ──────────────────────────────────────────────

pub fn list_linked_patients(
    conn: &Connection,
    professional_id: Uuid,
) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE linked_professional_id = ?1 ORDER BY full_name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![professional_id.to_string()], read_row)?;
    rows.map(|r| patient_from_row(r?)).collect()
}

pub fn list_pending_requesters(
    conn: &Connection,
    professional_id: Uuid,
) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE request_professional_id = ?1 AND request_status = 'pending'
         ORDER BY full_name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![professional_id.to_string()], read_row)?;
    rows.map(|r| patient_from_row(r?)).collect()
}
