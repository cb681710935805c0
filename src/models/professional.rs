use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{FeeBracket, Insurer, Modality, PracticeType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: Uuid,
    /// Normalized to bare digits; globally unique.
    pub national_id: String,
    pub full_name: String,
    /// Lowercased; globally unique.
    pub email: String,
    /// Professional license (CRM/CRP); globally unique.
    pub license_id: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub practice_type: PracticeType,
    pub fee_bracket: FeeBracket,
    pub insurers: Vec<Insurer>,
    pub modalities: Vec<Modality>,
    pub bio: String,
    pub location: String,
    pub phone: String,
    /// Immutable after registration.
    pub registered_at: NaiveDateTime,
}

/// Fields accepted when registering a professional.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfessional {
    pub national_id: String,
    pub full_name: String,
    pub email: String,
    pub license_id: String,
    pub password_hash: String,
    pub practice_type: PracticeType,
    pub fee_bracket: FeeBracket,
    #[serde(default)]
    pub insurers: Vec<Insurer>,
    #[serde(default)]
    pub modalities: Vec<Modality>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub phone: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfessionalUpdate {
    pub national_id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub license_id: Option<String>,
    pub password_hash: Option<String>,
    pub practice_type: Option<PracticeType>,
    pub fee_bracket: Option<FeeBracket>,
    pub insurers: Option<Vec<Insurer>>,
    pub modalities: Option<Vec<Modality>>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
}
