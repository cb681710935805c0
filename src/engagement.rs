//! Engagement State Machine — the request/accept/reject protocol that
//! links a patient to exactly one professional.
//!
//! Every mutation, including the administrative direct-link path, goes
//! through this module so the single-active-link and
//! single-pending-request invariants are enforced in one place. Each
//! transition reads the tagged state to produce a precise error, then
//! writes through a guarded UPDATE that re-asserts the precondition;
//! zero affected rows means a concurrent transition won, and the error
//! is re-derived from fresh state instead of trusting the stale read.

use rusqlite::Connection;
use serde::Serialize;
use tracing;
use uuid::Uuid;

use crate::db::repository::{patient as patients, professional as professionals};
use crate::error::CareError;
use crate::identity;
use crate::models::{Decision, Engagement, Patient, Professional, RequestOutcome};

/// Capability required by the administrative direct-link path.
///
/// Constructed by the transport layer only for callers holding the
/// admin grant. Every use is logged as a privileged override.
#[derive(Debug, Clone)]
pub struct AdminOverride {
    actor: String,
}

impl AdminOverride {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}

/// Patient summary shown to a professional reviewing their inbox.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequestView {
    pub patient_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub national_id: String,
}

impl From<Patient> for PendingRequestView {
    fn from(patient: Patient) -> Self {
        Self {
            patient_id: patient.id,
            full_name: patient.full_name,
            email: patient.email,
            national_id: patient.national_id,
        }
    }
}

// ── Transitions ─────────────────────────────────────────────────────

/// Patient proposes an engagement to a professional.
///
/// Allowed from `Unlinked` or `Decided`; a decided request is history,
/// not a blocker.
pub fn send_request(
    conn: &Connection,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<Engagement, CareError> {
    let patient = identity::get_patient(conn, patient_id)?;
    if !professionals::professional_exists(conn, professional_id)? {
        return Err(CareError::not_found("professional", professional_id));
    }

    match patient.engagement {
        Engagement::Linked { .. } => return Err(CareError::AlreadyLinked),
        Engagement::Pending { .. } => return Err(CareError::RequestAlreadyPending),
        Engagement::Unlinked | Engagement::Decided { .. } => {}
    }

    if patients::set_pending_request(conn, patient_id, professional_id)? == 0 {
        return Err(send_conflict(conn, patient_id)?);
    }

    tracing::debug!(%patient_id, %professional_id, "engagement request sent");
    Ok(Engagement::Pending { professional_id })
}

/// The guarded write landed on a row whose state moved under us;
/// report what the state actually is now.
fn send_conflict(conn: &Connection, patient_id: Uuid) -> Result<CareError, CareError> {
    let patient = identity::get_patient(conn, patient_id)?;
    Ok(match patient.engagement {
        Engagement::Linked { .. } => CareError::AlreadyLinked,
        _ => CareError::RequestAlreadyPending,
    })
}

/// Patient withdraws their pending request.
pub fn cancel_request(conn: &Connection, patient_id: Uuid) -> Result<(), CareError> {
    let patient = identity::get_patient(conn, patient_id)?;
    if patient.engagement.pending_target().is_none() {
        return Err(CareError::NoPendingRequest);
    }

    if patients::clear_pending_request(conn, patient_id)? == 0 {
        return Err(CareError::NoPendingRequest);
    }

    tracing::debug!(%patient_id, "engagement request cancelled");
    Ok(())
}

/// Professional accepts or rejects a request addressed to them.
///
/// Accept links the patient and records the accepted status in the
/// same write; reject leaves a decided marker that does not block a
/// future request.
pub fn decide_request(
    conn: &Connection,
    professional_id: Uuid,
    patient_id: Uuid,
    decision: Decision,
) -> Result<Engagement, CareError> {
    identity::get_professional(conn, professional_id)?;
    let patient = identity::get_patient(conn, patient_id)?;

    let target = patient
        .engagement
        .pending_target()
        .ok_or(CareError::NoPendingRequest)?;
    if target != professional_id {
        return Err(CareError::Forbidden);
    }

    let affected = match decision {
        Decision::Accept => patients::accept_pending_request(conn, patient_id, professional_id)?,
        Decision::Reject => patients::reject_pending_request(conn, patient_id, professional_id)?,
    };
    if affected == 0 {
        // Already resolved by a concurrent decision
        return Err(CareError::NoPendingRequest);
    }

    match decision {
        Decision::Accept => {
            tracing::info!(%patient_id, %professional_id, "engagement request accepted");
            Ok(Engagement::Linked { professional_id })
        }
        Decision::Reject => {
            tracing::info!(%patient_id, %professional_id, "engagement request rejected");
            Ok(Engagement::Decided {
                professional_id,
                outcome: RequestOutcome::Rejected,
            })
        }
    }
}

/// Patient dissolves their active engagement.
pub fn unlink_by_patient(conn: &Connection, patient_id: Uuid) -> Result<(), CareError> {
    let patient = identity::get_patient(conn, patient_id)?;
    if patient.engagement.linked_professional().is_none() {
        return Err(CareError::NotLinked);
    }

    if patients::clear_link(conn, patient_id, None)? == 0 {
        return Err(CareError::NotLinked);
    }

    tracing::info!(%patient_id, "patient unlinked");
    Ok(())
}

/// Professional dissolves an engagement with one of their patients.
pub fn unlink_by_professional(
    conn: &Connection,
    professional_id: Uuid,
    patient_id: Uuid,
) -> Result<(), CareError> {
    identity::get_professional(conn, professional_id)?;
    let patient = identity::get_patient(conn, patient_id)?;

    match patient.engagement.linked_professional() {
        None => return Err(CareError::NotLinked),
        Some(linked) if linked != professional_id => return Err(CareError::Mismatch),
        Some(_) => {}
    }

    if patients::clear_link(conn, patient_id, Some(professional_id))? == 0 {
        return Err(CareError::NotLinked);
    }

    tracing::info!(%patient_id, %professional_id, "professional unlinked patient");
    Ok(())
}

/// Administrative shortcut: link a patient to a professional without
/// the request protocol. Replaces whatever state the patient was in —
/// the request columns are reset so the row stays representable.
pub fn direct_link(
    conn: &Connection,
    grant: &AdminOverride,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<Engagement, CareError> {
    identity::get_patient(conn, patient_id)?;
    identity::get_professional(conn, professional_id)?;

    patients::force_link(conn, patient_id, professional_id)?;

    tracing::warn!(
        actor = grant.actor(),
        %patient_id,
        %professional_id,
        "privileged override: direct link applied"
    );
    Ok(Engagement::Linked { professional_id })
}

// ── Queries ─────────────────────────────────────────────────────────

/// Current request/decision/link state for a patient.
///
/// A link whose professional no longer exists resolves to `Unlinked`
/// rather than erroring.
pub fn current_engagement(conn: &Connection, patient_id: Uuid) -> Result<Engagement, CareError> {
    let patient = identity::get_patient(conn, patient_id)?;
    if let Some(professional_id) = patient.engagement.linked_professional() {
        if !professionals::professional_exists(conn, professional_id)? {
            return Ok(Engagement::Unlinked);
        }
    }
    Ok(patient.engagement)
}

/// Requests awaiting this professional's decision.
pub fn pending_requests_for(
    conn: &Connection,
    professional_id: Uuid,
) -> Result<Vec<PendingRequestView>, CareError> {
    identity::get_professional(conn, professional_id)?;
    let requesters = patients::list_pending_requesters(conn, professional_id)?;
    Ok(requesters.into_iter().map(PendingRequestView::from).collect())
}

/// Patients whose active link points at this professional.
pub fn linked_patients(
    conn: &Connection,
    professional_id: Uuid,
) -> Result<Vec<Patient>, CareError> {
    identity::get_professional(conn, professional_id)?;
    Ok(patients::list_linked_patients(conn, professional_id)?)
}

/// The professional a patient is currently linked to, if any.
pub fn linked_professional(
    conn: &Connection,
    patient_id: Uuid,
) -> Result<Option<Professional>, CareError> {
    let patient = identity::get_patient(conn, patient_id)?;
    match patient.engagement.linked_professional() {
        Some(professional_id) => Ok(professionals::get_professional(conn, professional_id)?),
        None => Ok(None),
    }
}
