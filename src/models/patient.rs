use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::engagement::Engagement;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// Normalized to bare digits; globally unique.
    pub national_id: String,
    pub full_name: String,
    /// Lowercased; globally unique.
    pub email: String,
    /// Opaque hash produced by the external credential service.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Immutable after registration.
    pub registered_at: NaiveDateTime,
    pub engagement: Engagement,
}

/// Fields accepted when registering a patient.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub national_id: String,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientUpdate {
    pub national_id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}
