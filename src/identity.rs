//! Identity Store — patient and professional registration, lookup,
//! update, and removal, with global uniqueness on identity fields.
//!
//! Shape of every mutation: validate and normalize first (a malformed
//! input never reaches a lookup), pre-check duplicates through
//! `db::conflict` for a friendly error, then write. The unique indexes
//! remain authoritative: a constraint failure from a concurrent writer
//! is mapped to the same `DuplicateIdentity` the pre-check produces.

use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use rusqlite::Connection;
use tracing;
use uuid::Uuid;

use crate::db;
use crate::db::conflict::{self, IdentityField, RecordKind};
use crate::db::repository::{patient as patients, professional as professionals};
use crate::error::CareError;
use crate::models::{
    Engagement, NewPatient, NewProfessional, Patient, PatientUpdate, Professional,
    ProfessionalUpdate,
};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

const NATIONAL_ID_DIGITS: usize = 11;
const MAX_NAME_LEN: usize = 100;
const MAX_BIO_LEN: usize = 1000;
const MAX_LOCATION_LEN: usize = 200;
const MAX_PHONE_LEN: usize = 20;

// ── Normalization / validation ──────────────────────────────────────

/// Strip formatting (dots, dashes, spaces) and require exactly eleven
/// digits. Identity comparison always happens on the normalized form.
pub fn normalize_national_id(raw: &str) -> Result<String, CareError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != NATIONAL_ID_DIGITS {
        return Err(CareError::Validation(format!(
            "national id must contain exactly {NATIONAL_ID_DIGITS} digits"
        )));
    }
    Ok(digits)
}

fn normalize_email(raw: &str) -> Result<String, CareError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(CareError::Validation("invalid email".into()));
    }
    Ok(email)
}

fn normalize_name(raw: &str) -> Result<String, CareError> {
    let name = raw.trim().to_string();
    if name.is_empty() {
        return Err(CareError::Validation("full name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CareError::Validation(format!(
            "full name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

fn check_len(value: &str, max: usize, what: &str) -> Result<(), CareError> {
    if value.chars().count() > max {
        return Err(CareError::Validation(format!(
            "{what} cannot exceed {max} characters"
        )));
    }
    Ok(())
}

fn require_hash(hash: &str) -> Result<(), CareError> {
    if hash.trim().is_empty() {
        return Err(CareError::Validation("credential hash is required".into()));
    }
    Ok(())
}

fn require_license(raw: &str) -> Result<String, CareError> {
    let license = raw.trim().to_string();
    if license.is_empty() {
        return Err(CareError::Validation("license id is required".into()));
    }
    Ok(license)
}

/// Turn a unique-index failure into the duplicate error the pre-check
/// would have produced for the same field.
fn map_write_err(err: rusqlite::Error) -> CareError {
    if let Some(violation) = db::unique_violation(&err) {
        if let Some(field) = IdentityField::from_violation(&violation) {
            return CareError::DuplicateIdentity { field };
        }
    }
    CareError::Database(err.into())
}

/// Report the first collision among the given `(field, value)` pairs,
/// in the order given — the fixed priority order for duplicate errors.
fn check_conflicts(
    conn: &Connection,
    kind: RecordKind,
    checks: &[(IdentityField, &str)],
    exclude: Option<Uuid>,
) -> Result<(), CareError> {
    for (field, value) in checks {
        if conflict::identity_in_use(conn, kind, *field, value, exclude)? {
            return Err(CareError::DuplicateIdentity { field: *field });
        }
    }
    Ok(())
}

// ── Patients ────────────────────────────────────────────────────────

pub fn register_patient(conn: &Connection, new: NewPatient) -> Result<Patient, CareError> {
    let national_id = normalize_national_id(&new.national_id)?;
    let full_name = normalize_name(&new.full_name)?;
    let email = normalize_email(&new.email)?;
    require_hash(&new.password_hash)?;

    check_conflicts(
        conn,
        RecordKind::Patient,
        &[
            (IdentityField::NationalId, &national_id),
            (IdentityField::Email, &email),
        ],
        None,
    )?;

    let patient = Patient {
        id: Uuid::new_v4(),
        national_id,
        full_name,
        email,
        password_hash: new.password_hash,
        registered_at: Local::now().naive_local(),
        engagement: Engagement::Unlinked,
    };
    patients::insert_patient(conn, &patient).map_err(map_write_err)?;

    tracing::debug!(patient_id = %patient.id, "patient registered");
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: Uuid) -> Result<Patient, CareError> {
    patients::get_patient(conn, id)?.ok_or_else(|| CareError::not_found("patient", id))
}

pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, CareError> {
    Ok(patients::list_patients(conn)?)
}

/// Lookup by national id; the query value is normalized the same way
/// stored ids are.
pub fn find_patient_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Patient, CareError> {
    let normalized = normalize_national_id(national_id)?;
    patients::get_patient_by_national_id(conn, &normalized)?
        .ok_or_else(|| CareError::not_found("patient", normalized))
}

pub fn update_patient(
    conn: &Connection,
    id: Uuid,
    update: PatientUpdate,
) -> Result<Patient, CareError> {
    let national_id = update
        .national_id
        .as_deref()
        .map(normalize_national_id)
        .transpose()?;
    let full_name = update.full_name.as_deref().map(normalize_name).transpose()?;
    let email = update.email.as_deref().map(normalize_email).transpose()?;
    if let Some(hash) = update.password_hash.as_deref() {
        require_hash(hash)?;
    }

    // Existence before collision checks, so a bad id reads as NotFound
    get_patient(conn, id)?;

    let mut checks = Vec::new();
    if let Some(value) = national_id.as_deref() {
        checks.push((IdentityField::NationalId, value));
    }
    if let Some(value) = email.as_deref() {
        checks.push((IdentityField::Email, value));
    }
    check_conflicts(conn, RecordKind::Patient, &checks, Some(id))?;

    patients::update_patient_fields(
        conn,
        id,
        national_id.as_deref(),
        full_name.as_deref(),
        email.as_deref(),
        update.password_hash.as_deref(),
    )
    .map_err(map_write_err)?;

    get_patient(conn, id)
}

pub fn delete_patient(conn: &Connection, id: Uuid) -> Result<(), CareError> {
    if !patients::delete_patient(conn, id)? {
        return Err(CareError::not_found("patient", id));
    }
    tracing::debug!(patient_id = %id, "patient removed");
    Ok(())
}

// ── Professionals ───────────────────────────────────────────────────

pub fn register_professional(
    conn: &Connection,
    new: NewProfessional,
) -> Result<Professional, CareError> {
    let national_id = normalize_national_id(&new.national_id)?;
    let full_name = normalize_name(&new.full_name)?;
    let email = normalize_email(&new.email)?;
    let license_id = require_license(&new.license_id)?;
    require_hash(&new.password_hash)?;
    check_len(&new.bio, MAX_BIO_LEN, "bio")?;
    check_len(&new.location, MAX_LOCATION_LEN, "location")?;
    check_len(&new.phone, MAX_PHONE_LEN, "phone")?;

    check_conflicts(
        conn,
        RecordKind::Professional,
        &[
            (IdentityField::NationalId, &national_id),
            (IdentityField::Email, &email),
            (IdentityField::LicenseId, &license_id),
        ],
        None,
    )?;

    let professional = Professional {
        id: Uuid::new_v4(),
        national_id,
        full_name,
        email,
        license_id,
        password_hash: new.password_hash,
        practice_type: new.practice_type,
        fee_bracket: new.fee_bracket,
        insurers: new.insurers,
        modalities: new.modalities,
        bio: new.bio,
        location: new.location,
        phone: new.phone,
        registered_at: Local::now().naive_local(),
    };
    professionals::insert_professional(conn, &professional).map_err(map_write_err)?;

    tracing::debug!(professional_id = %professional.id, "professional registered");
    Ok(professional)
}

pub fn get_professional(conn: &Connection, id: Uuid) -> Result<Professional, CareError> {
    professionals::get_professional(conn, id)?
        .ok_or_else(|| CareError::not_found("professional", id))
}

pub fn list_professionals(conn: &Connection) -> Result<Vec<Professional>, CareError> {
    Ok(professionals::list_professionals(conn)?)
}

pub fn update_professional(
    conn: &Connection,
    id: Uuid,
    update: ProfessionalUpdate,
) -> Result<Professional, CareError> {
    let national_id = update
        .national_id
        .as_deref()
        .map(normalize_national_id)
        .transpose()?;
    let full_name = update.full_name.as_deref().map(normalize_name).transpose()?;
    let email = update.email.as_deref().map(normalize_email).transpose()?;
    let license_id = update
        .license_id
        .as_deref()
        .map(require_license)
        .transpose()?;
    if let Some(hash) = update.password_hash.as_deref() {
        require_hash(hash)?;
    }
    if let Some(bio) = update.bio.as_deref() {
        check_len(bio, MAX_BIO_LEN, "bio")?;
    }
    if let Some(location) = update.location.as_deref() {
        check_len(location, MAX_LOCATION_LEN, "location")?;
    }
    if let Some(phone) = update.phone.as_deref() {
        check_len(phone, MAX_PHONE_LEN, "phone")?;
    }

    get_professional(conn, id)?;

    let mut checks = Vec::new();
    if let Some(value) = national_id.as_deref() {
        checks.push((IdentityField::NationalId, value));
    }
    if let Some(value) = email.as_deref() {
        checks.push((IdentityField::Email, value));
    }
    if let Some(value) = license_id.as_deref() {
        checks.push((IdentityField::LicenseId, value));
    }
    check_conflicts(conn, RecordKind::Professional, &checks, Some(id))?;

    professionals::update_professional_fields(
        conn,
        id,
        national_id.as_deref(),
        full_name.as_deref(),
        email.as_deref(),
        license_id.as_deref(),
        update.password_hash.as_deref(),
        update.practice_type.as_ref(),
        update.fee_bracket.as_ref(),
        update.insurers.as_deref(),
        update.modalities.as_deref(),
        update.bio.as_deref(),
        update.location.as_deref(),
        update.phone.as_deref(),
    )
    .map_err(map_write_err)?;

    get_professional(conn, id)
}

/// Remove a professional, cascade-clearing every patient link and
/// request that targets them. One transaction: either the references
/// are cleared and the row is gone, or nothing changed.
pub fn delete_professional(conn: &Connection, id: Uuid) -> Result<(), CareError> {
    let tx = conn.unchecked_transaction().map_err(db::DatabaseError::from)?;
    let cleared = professionals::clear_references_to(&tx, id)?;
    if !professionals::delete_professional_row(&tx, id)? {
        return Err(CareError::not_found("professional", id));
    }
    tx.commit().map_err(db::DatabaseError::from)?;

    tracing::info!(professional_id = %id, cleared, "professional removed, references cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{FeeBracket, Insurer, Modality, PracticeType};

    fn new_patient(national_id: &str, email: &str) -> NewPatient {
        NewPatient {
            national_id: national_id.into(),
            full_name: "Maria Souza".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
        }
    }

    fn new_professional(
        national_id: &str,
        email: &str,
        license_id: &str,
    ) -> NewProfessional {
        NewProfessional {
            national_id: national_id.into(),
            full_name: "Dr. Carlos Lima".into(),
            email: email.into(),
            license_id: license_id.into(),
            password_hash: "$argon2id$stub".into(),
            practice_type: PracticeType::Clinic,
            fee_bracket: FeeBracket::Mid,
            insurers: vec![Insurer::Unimed],
            modalities: vec![Modality::Online],
            bio: String::new(),
            location: String::new(),
            phone: String::new(),
        }
    }

    #[test]
    fn registration_normalizes_identity_fields() {
        let conn = open_memory_database().unwrap();
        let patient = register_patient(
            &conn,
            new_patient("123.456.789-01", "  Maria@Example.COM "),
        )
        .unwrap();

        assert_eq!(patient.national_id, "12345678901");
        assert_eq!(patient.email, "maria@example.com");
        assert_eq!(patient.engagement, Engagement::Unlinked);
    }

    #[test]
    fn duplicate_national_id_names_the_field() {
        let conn = open_memory_database().unwrap();
        register_patient(&conn, new_patient("12345678901", "a@x.com")).unwrap();

        // Different email, same national id
        let err = register_patient(&conn, new_patient("12345678901", "b@x.com")).unwrap_err();
        assert!(matches!(
            err,
            CareError::DuplicateIdentity {
                field: IdentityField::NationalId
            }
        ));
    }

    #[test]
    fn duplicate_email_detected_after_national_id() {
        let conn = open_memory_database().unwrap();
        register_patient(&conn, new_patient("12345678901", "a@x.com")).unwrap();

        let err = register_patient(&conn, new_patient("98765432109", "a@x.com")).unwrap_err();
        assert!(matches!(
            err,
            CareError::DuplicateIdentity {
                field: IdentityField::Email
            }
        ));
    }

    #[test]
    fn malformed_input_fails_before_any_lookup() {
        let conn = open_memory_database().unwrap();
        let err = register_patient(&conn, new_patient("123", "a@x.com")).unwrap_err();
        assert!(matches!(err, CareError::Validation(_)));

        let err = register_patient(&conn, new_patient("12345678901", "not-an-email")).unwrap_err();
        assert!(matches!(err, CareError::Validation(_)));

        assert_eq!(list_patients(&conn).unwrap().len(), 0);
    }

    #[test]
    fn update_excludes_own_record_from_collision_search() {
        let conn = open_memory_database().unwrap();
        let patient = register_patient(&conn, new_patient("12345678901", "a@x.com")).unwrap();

        // Re-submitting the patient's own values is not a collision
        let updated = update_patient(
            &conn,
            patient.id,
            PatientUpdate {
                email: Some("a@x.com".into()),
                full_name: Some("Maria S. Souza".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.full_name, "Maria S. Souza");
        assert_eq!(updated.registered_at, patient.registered_at);
    }

    #[test]
    fn update_reports_first_collision_in_priority_order() {
        let conn = open_memory_database().unwrap();
        register_patient(&conn, new_patient("12345678901", "a@x.com")).unwrap();
        let other = register_patient(&conn, new_patient("98765432109", "b@x.com")).unwrap();

        // Both fields collide; national id is reported first
        let err = update_patient(
            &conn,
            other.id,
            PatientUpdate {
                national_id: Some("12345678901".into()),
                email: Some("a@x.com".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CareError::DuplicateIdentity {
                field: IdentityField::NationalId
            }
        ));

        // Failed update wrote nothing
        let unchanged = get_patient(&conn, other.id).unwrap();
        assert_eq!(unchanged.national_id, "98765432109");
        assert_eq!(unchanged.email, "b@x.com");
    }

    #[test]
    fn professional_license_collision_reported_last() {
        let conn = open_memory_database().unwrap();
        register_professional(&conn, new_professional("11111111111", "a@x.com", "CRP-100"))
            .unwrap();

        let err = register_professional(
            &conn,
            new_professional("22222222222", "b@x.com", "CRP-100"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CareError::DuplicateIdentity {
                field: IdentityField::LicenseId
            }
        ));
    }

    #[test]
    fn find_by_national_id_accepts_formatted_input() {
        let conn = open_memory_database().unwrap();
        let patient = register_patient(&conn, new_patient("12345678901", "a@x.com")).unwrap();

        let found = find_patient_by_national_id(&conn, "123.456.789-01").unwrap();
        assert_eq!(found.id, patient.id);

        let err = find_patient_by_national_id(&conn, "00000000000").unwrap_err();
        assert!(matches!(err, CareError::NotFound { .. }));
    }

    #[test]
    fn listings_sort_by_name() {
        let conn = open_memory_database().unwrap();
        let mut zeta = new_patient("11111111111", "z@x.com");
        zeta.full_name = "Zeta".into();
        let mut ana = new_patient("22222222222", "a@x.com");
        ana.full_name = "Ana".into();
        register_patient(&conn, zeta).unwrap();
        register_patient(&conn, ana).unwrap();

        let names: Vec<String> = list_patients(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.full_name)
            .collect();
        assert_eq!(names, vec!["Ana".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn professional_round_trips_practice_metadata() {
        let conn = open_memory_database().unwrap();
        let mut new = new_professional("11111111111", "a@x.com", "CRP-1");
        new.insurers = vec![Insurer::Amil, Insurer::Hapvida];
        new.modalities = vec![Modality::Hybrid, Modality::InPerson];
        new.bio = "Cognitive behavioral therapy".into();
        let professional = register_professional(&conn, new).unwrap();

        let fetched = get_professional(&conn, professional.id).unwrap();
        assert_eq!(fetched.insurers, vec![Insurer::Amil, Insurer::Hapvida]);
        assert_eq!(fetched.modalities, vec![Modality::Hybrid, Modality::InPerson]);
        assert_eq!(fetched.fee_bracket, FeeBracket::Mid);
    }

    #[test]
    fn delete_missing_record_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = delete_patient(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CareError::NotFound { .. }));

        let err = delete_professional(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CareError::NotFound { .. }));
    }
}
