use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::Mood;

/// One patient's mood record for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub mood: Mood,
    /// Local calendar day the entry belongs to, derived from the
    /// caller's local clock — never from UTC.
    pub entry_date: NaiveDate,
    pub registered_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

/// Whether an upsert created a fresh entry or overwrote today's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyWrite {
    Created,
    Updated,
}
