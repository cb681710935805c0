//! Crate-wide error taxonomy.
//!
//! Every failure is terminal for the triggering operation and leaves
//! the store unchanged — invariant violations are reported, never
//! retried. The transport layer maps `code()` onto its status classes
//! (not-found → 404, duplicate/conflict → 409, forbidden/mismatch →
//! 403, validation → 400).

use thiserror::Error;

use crate::db::conflict::IdentityField;
use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum CareError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{field} already registered")]
    DuplicateIdentity { field: IdentityField },

    #[error("patient is already linked to a professional")]
    AlreadyLinked,

    #[error("patient already has a pending request")]
    RequestAlreadyPending,

    #[error("patient has no pending request")]
    NoPendingRequest,

    #[error("professional is not the addressee of this request")]
    Forbidden,

    #[error("patient is not linked to this professional")]
    Mismatch,

    #[error("patient is not linked to any professional")]
    NotLinked,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl CareError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code for transport-layer mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DuplicateIdentity { .. } => "DUPLICATE_IDENTITY",
            Self::AlreadyLinked => "ALREADY_LINKED",
            Self::RequestAlreadyPending => "REQUEST_ALREADY_PENDING",
            Self::NoPendingRequest => "NO_PENDING_REQUEST",
            Self::Forbidden => "FORBIDDEN",
            Self::Mismatch => "MISMATCH",
            Self::NotLinked => "NOT_LINKED",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::LockPoisoned => "INTERNAL",
            Self::Database(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_error_names_the_field() {
        let err = CareError::DuplicateIdentity {
            field: IdentityField::NationalId,
        };
        assert_eq!(err.to_string(), "national id already registered");
        assert_eq!(err.code(), "DUPLICATE_IDENTITY");
    }

    #[test]
    fn conflict_codes_are_distinct_from_not_found() {
        assert_ne!(CareError::AlreadyLinked.code(), "NOT_FOUND");
        assert_ne!(CareError::RequestAlreadyPending.code(), "NOT_FOUND");
        assert_eq!(
            CareError::not_found("patient", "abc").code(),
            "NOT_FOUND"
        );
    }
}
