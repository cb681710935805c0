//! Daily mood register — at most one entry per patient per local
//! calendar day, with create-or-update-in-place semantics.
//!
//! The day is the caller's local date, never a UTC instant: an entry
//! written at 23:30 local belongs to that local day even when UTC has
//! already rolled over. The stored `entry_date` column carries that
//! local day, and `UNIQUE (patient_id, entry_date)` makes the
//! singleton a storage-level fact.

use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use tracing;
use uuid::Uuid;

use crate::db::conflict;
use crate::db::repository::mood as moods;
use crate::error::CareError;
use crate::identity;
use crate::models::{DailyWrite, Mood, MoodEntry};

/// Record the patient's mood for today, overwriting today's entry if
/// one exists. Never reports not-found for the entry itself — only a
/// missing patient is an error.
pub fn upsert_today(
    conn: &Connection,
    patient_id: Uuid,
    mood: Mood,
) -> Result<(MoodEntry, DailyWrite), CareError> {
    identity::get_patient(conn, patient_id)?;

    let now = Local::now().naive_local();
    let today = now.date();

    // Flag only; the write itself is conflict-safe either way
    let write = if conflict::mood_recorded_on(conn, patient_id, today)? {
        DailyWrite::Updated
    } else {
        DailyWrite::Created
    };

    let entry = MoodEntry {
        id: Uuid::new_v4(),
        patient_id,
        mood,
        entry_date: today,
        registered_at: now,
        updated_at: None,
    };
    moods::upsert_entry(conn, &entry)?;

    // Re-read: on the update path the surviving row keeps its original
    // id and registration timestamp.
    let stored = moods::find_by_day(conn, patient_id, today)?
        .ok_or_else(|| CareError::not_found("mood entry", patient_id))?;

    tracing::debug!(%patient_id, day = %today, ?write, "mood recorded");
    Ok((stored, write))
}

/// The patient's entry for a specific local day; `NotFound` if absent.
pub fn get_for_day(
    conn: &Connection,
    patient_id: Uuid,
    date: NaiveDate,
) -> Result<MoodEntry, CareError> {
    identity::get_patient(conn, patient_id)?;
    moods::find_by_day(conn, patient_id, date)?
        .ok_or_else(|| CareError::not_found("mood entry", date))
}

/// Full mood history, newest first.
pub fn list_for_patient(conn: &Connection, patient_id: Uuid) -> Result<Vec<MoodEntry>, CareError> {
    identity::get_patient(conn, patient_id)?;
    Ok(moods::list_for_patient(conn, patient_id)?)
}

pub fn delete_entry(conn: &Connection, entry_id: Uuid) -> Result<(), CareError> {
    if !moods::delete_entry_row(conn, entry_id)? {
        return Err(CareError::not_found("mood entry", entry_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::NewPatient;

    fn seed_patient(conn: &Connection) -> Uuid {
        identity::register_patient(
            conn,
            NewPatient {
                national_id: "12345678901".into(),
                full_name: "Maria Souza".into(),
                email: "maria@x.com".into(),
                password_hash: "$argon2id$stub".into(),
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn same_day_writes_collapse_to_one_entry() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);

        let (first, write) = upsert_today(&conn, patient, Mood::Happy).unwrap();
        assert_eq!(write, DailyWrite::Created);
        assert_eq!(first.mood, Mood::Happy);
        assert!(first.updated_at.is_none());

        let (second, write) = upsert_today(&conn, patient, Mood::Sad).unwrap();
        assert_eq!(write, DailyWrite::Updated);
        assert_eq!(second.mood, Mood::Sad);
        assert!(second.updated_at.is_some());

        // Same entry, overwritten in place
        assert_eq!(second.id, first.id);
        assert_eq!(second.registered_at, first.registered_at);
        assert_eq!(list_for_patient(&conn, patient).unwrap().len(), 1);
    }

    #[test]
    fn next_day_gets_an_independent_entry() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);

        // Yesterday's entry, written directly at the repository level
        let today = Local::now().date_naive();
        let yesterday = today.pred_opt().unwrap();
        moods::upsert_entry(
            &conn,
            &MoodEntry {
                id: Uuid::new_v4(),
                patient_id: patient,
                mood: Mood::Neutral,
                entry_date: yesterday,
                registered_at: yesterday.and_hms_opt(9, 0, 0).unwrap(),
                updated_at: None,
            },
        )
        .unwrap();

        let (entry, write) = upsert_today(&conn, patient, Mood::Happy).unwrap();
        assert_eq!(write, DailyWrite::Created);
        assert_eq!(entry.entry_date, today);

        let history = list_for_patient(&conn, patient).unwrap();
        assert_eq!(history.len(), 2);
        // Newest first
        assert_eq!(history[0].entry_date, today);
        assert_eq!(history[1].mood, Mood::Neutral);
    }

    #[test]
    fn blank_mood_is_a_valid_entry() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);

        let (entry, _) = upsert_today(&conn, patient, Mood::Unset).unwrap();
        assert_eq!(entry.mood, Mood::Unset);
    }

    #[test]
    fn get_for_day_distinguishes_absent_from_present() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let today = Local::now().date_naive();

        let err = get_for_day(&conn, patient, today).unwrap_err();
        assert!(matches!(err, CareError::NotFound { .. }));

        upsert_today(&conn, patient, Mood::VeryHappy).unwrap();
        let entry = get_for_day(&conn, patient, today).unwrap();
        assert_eq!(entry.mood, Mood::VeryHappy);

        // A different day stays absent
        let err = get_for_day(&conn, patient, today.pred_opt().unwrap()).unwrap_err();
        assert!(matches!(err, CareError::NotFound { .. }));
    }

    #[test]
    fn upsert_requires_an_existing_patient() {
        let conn = open_memory_database().unwrap();
        let err = upsert_today(&conn, Uuid::new_v4(), Mood::Happy).unwrap_err();
        assert!(matches!(err, CareError::NotFound { entity: "patient", .. }));
    }

    #[test]
    fn delete_removes_a_single_entry() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let (entry, _) = upsert_today(&conn, patient, Mood::Happy).unwrap();

        delete_entry(&conn, entry.id).unwrap();
        assert!(list_for_patient(&conn, patient).unwrap().is_empty());

        let err = delete_entry(&conn, entry.id).unwrap_err();
        assert!(matches!(err, CareError::NotFound { .. }));
    }
}
