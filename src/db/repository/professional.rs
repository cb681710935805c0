//! Professional rows — mapping plus one function per statement.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{FeeBracket, Insurer, Modality, PracticeType, Professional};

const PROFESSIONAL_COLUMNS: &str = "id, national_id, full_name, email, license_id, password_hash,
     practice_type, fee_bracket, insurers, modalities, bio, location, phone, registered_at";

struct ProfessionalRow {
    id: String,
    national_id: String,
    full_name: String,
    email: String,
    license_id: String,
    password_hash: String,
    practice_type: String,
    fee_bracket: String,
    insurers: String,
    modalities: String,
    bio: String,
    location: String,
    phone: String,
    registered_at: NaiveDateTime,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfessionalRow> {
    Ok(ProfessionalRow {
        id: row.get(0)?,
        national_id: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        license_id: row.get(4)?,
        password_hash: row.get(5)?,
        practice_type: row.get(6)?,
        fee_bracket: row.get(7)?,
        insurers: row.get(8)?,
        modalities: row.get(9)?,
        bio: row.get(10)?,
        location: row.get(11)?,
        phone: row.get(12)?,
        registered_at: row.get(13)?,
    })
}

fn professional_from_row(row: ProfessionalRow) -> Result<Professional, DatabaseError> {
    let insurers: Vec<String> = serde_json::from_str(&row.insurers)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    let modalities: Vec<String> = serde_json::from_str(&row.modalities)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;

    Ok(Professional {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        national_id: row.national_id,
        full_name: row.full_name,
        email: row.email,
        license_id: row.license_id,
        password_hash: row.password_hash,
        practice_type: PracticeType::from_str(&row.practice_type)?,
        fee_bracket: FeeBracket::from_str(&row.fee_bracket)?,
        insurers: insurers
            .iter()
            .map(|s| Insurer::from_str(s))
            .collect::<Result<_, _>>()?,
        modalities: modalities
            .iter()
            .map(|s| Modality::from_str(s))
            .collect::<Result<_, _>>()?,
        bio: row.bio,
        location: row.location,
        phone: row.phone,
        registered_at: row.registered_at,
    })
}

fn encode_insurers(insurers: &[Insurer]) -> String {
    serde_json::to_string(&insurers.iter().map(|i| i.as_str()).collect::<Vec<_>>())
        .unwrap_or_else(|_| "[]".into())
}

fn encode_modalities(modalities: &[Modality]) -> String {
    serde_json::to_string(&modalities.iter().map(|m| m.as_str()).collect::<Vec<_>>())
        .unwrap_or_else(|_| "[]".into())
}

pub fn insert_professional(
    conn: &Connection,
    prof: &Professional,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO professionals (id, national_id, full_name, email, license_id, password_hash,
         practice_type, fee_bracket, insurers, modalities, bio, location, phone, registered_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            prof.id.to_string(),
            prof.national_id,
            prof.full_name,
            prof.email,
            prof.license_id,
            prof.password_hash,
            prof.practice_type.as_str(),
            prof.fee_bracket.as_str(),
            encode_insurers(&prof.insurers),
            encode_modalities(&prof.modalities),
            prof.bio,
            prof.location,
            prof.phone,
            prof.registered_at,
        ],
    )?;
    Ok(())
}

pub fn get_professional(
    conn: &Connection,
    id: Uuid,
) -> Result<Option<Professional>, DatabaseError> {
    let sql = format!("SELECT {PROFESSIONAL_COLUMNS} FROM professionals WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![id.to_string()], read_row);

    match result {
        Ok(row) => Ok(Some(professional_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn professional_exists(conn: &Connection, id: Uuid) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM professionals WHERE id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn list_professionals(conn: &Connection) -> Result<Vec<Professional>, DatabaseError> {
    let sql = format!("SELECT {PROFESSIONAL_COLUMNS} FROM professionals ORDER BY full_name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_row)?;
    rows.map(|r| professional_from_row(r?)).collect()
}

/// Partial field update; `None` leaves the column untouched.
#[allow(clippy::too_many_arguments)]
pub fn update_professional_fields(
    conn: &Connection,
    id: Uuid,
    national_id: Option<&str>,
    full_name: Option<&str>,
    email: Option<&str>,
    license_id: Option<&str>,
    password_hash: Option<&str>,
    practice_type: Option<&PracticeType>,
    fee_bracket: Option<&FeeBracket>,
    insurers: Option<&[Insurer]>,
    modalities: Option<&[Modality]>,
    bio: Option<&str>,
    location: Option<&str>,
    phone: Option<&str>,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE professionals SET
             national_id = COALESCE(?2, national_id),
             full_name = COALESCE(?3, full_name),
             email = COALESCE(?4, email),
             license_id = COALESCE(?5, license_id),
             password_hash = COALESCE(?6, password_hash),
             practice_type = COALESCE(?7, practice_type),
             fee_bracket = COALESCE(?8, fee_bracket),
             insurers = COALESCE(?9, insurers),
             modalities = COALESCE(?10, modalities),
             bio = COALESCE(?11, bio),
             location = COALESCE(?12, location),
             phone = COALESCE(?13, phone)
         WHERE id = ?1",
        params![
            id.to_string(),
            national_id,
            full_name,
            email,
            license_id,
            password_hash,
            practice_type.map(|p| p.as_str()),
            fee_bracket.map(|f| f.as_str()),
            insurers.map(encode_insurers),
            modalities.map(encode_modalities),
            bio,
            location,
            phone,
        ],
    )
}

pub fn delete_professional_row(conn: &Connection, id: Uuid) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM professionals WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Clear every patient link and request pointing at the professional.
/// Returns how many patient rows were touched.
pub fn clear_references_to(
    conn: &Connection,
    professional_id: Uuid,
) -> Result<usize, DatabaseError> {
    let id = professional_id.to_string();
    let unlinked = conn.execute(
        "UPDATE patients SET linked_professional_id = NULL
         WHERE linked_professional_id = ?1",
        params![id],
    )?;
    let cleared = conn.execute(
        "UPDATE patients SET request_professional_id = NULL, request_status = NULL
         WHERE request_professional_id = ?1",
        params![id],
    )?;
    Ok(unlinked + cleared)
}
