//! Mood entry rows — the daily singleton lives behind
//! `UNIQUE (patient_id, entry_date)`, so the upsert is a single
//! `INSERT … ON CONFLICT DO UPDATE` and concurrent same-day writers
//! can never produce a second row.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Mood, MoodEntry};

const MOOD_COLUMNS: &str = "id, patient_id, mood, entry_date, registered_at, updated_at";

struct MoodRow {
    id: String,
    patient_id: String,
    mood: String,
    entry_date: NaiveDate,
    registered_at: NaiveDateTime,
    updated_at: Option<NaiveDateTime>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MoodRow> {
    Ok(MoodRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        mood: row.get(2)?,
        entry_date: row.get(3)?,
        registered_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn entry_from_row(row: MoodRow) -> Result<MoodEntry, DatabaseError> {
    Ok(MoodEntry {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: Uuid::parse_str(&row.patient_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        mood: Mood::from_str(&row.mood)?,
        entry_date: row.entry_date,
        registered_at: row.registered_at,
        updated_at: row.updated_at,
    })
}

/// Insert today's entry, or overwrite the mood in place when the
/// patient already has one for `entry_date`. The existing row keeps
/// its id and registration timestamp; only `mood` and `updated_at`
/// change on the conflict path.
pub fn upsert_entry(conn: &Connection, entry: &MoodEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO mood_entries (id, patient_id, mood, entry_date, registered_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL)
         ON CONFLICT (patient_id, entry_date) DO UPDATE SET
             mood = excluded.mood,
             updated_at = excluded.registered_at",
        params![
            entry.id.to_string(),
            entry.patient_id.to_string(),
            entry.mood.as_str(),
            entry.entry_date,
            entry.registered_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_day(
    conn: &Connection,
    patient_id: Uuid,
    date: NaiveDate,
) -> Result<Option<MoodEntry>, DatabaseError> {
    let sql = format!(
        "SELECT {MOOD_COLUMNS} FROM mood_entries WHERE patient_id = ?1 AND entry_date = ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![patient_id.to_string(), date], read_row);

    match result {
        Ok(row) => Ok(Some(entry_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_for_patient(
    conn: &Connection,
    patient_id: Uuid,
) -> Result<Vec<MoodEntry>, DatabaseError> {
    let sql = format!(
        "SELECT {MOOD_COLUMNS} FROM mood_entries
         WHERE patient_id = ?1 ORDER BY registered_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id.to_string()], read_row)?;
    rows.map(|r| entry_from_row(r?)).collect()
}

pub fn delete_entry_row(conn: &Connection, id: Uuid) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM mood_entries WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(affected > 0)
}
