//! Tagged engagement state.
//!
//! The storage row keeps three nullable columns (link, request target,
//! request status), but the in-memory state is one tagged value so the
//! illegal "linked AND pending" combination is unrepresentable. CHECK
//! constraints in the schema ban the same combination at the row level.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{RequestOutcome, RequestStatus};

/// Per-patient engagement state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Engagement {
    /// No link, no request in flight.
    Unlinked,
    /// A request to `professional_id` awaits that professional's decision.
    Pending { professional_id: Uuid },
    /// Active engagement with `professional_id`.
    Linked { professional_id: Uuid },
    /// A decided request, kept for history display. Functionally
    /// equivalent to `Unlinked` when issuing a new request; observable
    /// only for rejections, since an accept lands in `Linked`.
    Decided {
        professional_id: Uuid,
        outcome: RequestOutcome,
    },
}

impl Engagement {
    /// Decode the tagged state from the three row columns.
    ///
    /// An orphaned status (no target) or a dangling reference decodes
    /// to `Unlinked` rather than erroring — the read side tolerates
    /// what the constraints could not prevent historically.
    pub fn from_columns(
        linked: Option<Uuid>,
        request_target: Option<Uuid>,
        request_status: Option<RequestStatus>,
    ) -> Self {
        if let Some(professional_id) = linked {
            return Self::Linked { professional_id };
        }
        match (request_target, request_status) {
            (Some(professional_id), Some(RequestStatus::Pending)) => {
                Self::Pending { professional_id }
            }
            (Some(professional_id), Some(RequestStatus::Accepted)) => Self::Decided {
                professional_id,
                outcome: RequestOutcome::Accepted,
            },
            (Some(professional_id), Some(RequestStatus::Rejected)) => Self::Decided {
                professional_id,
                outcome: RequestOutcome::Rejected,
            },
            _ => Self::Unlinked,
        }
    }

    /// Whether a new request may be issued from this state.
    pub fn accepts_new_request(&self) -> bool {
        matches!(self, Self::Unlinked | Self::Decided { .. })
    }

    pub fn linked_professional(&self) -> Option<Uuid> {
        match self {
            Self::Linked { professional_id } => Some(*professional_id),
            _ => None,
        }
    }

    pub fn pending_target(&self) -> Option<Uuid> {
        match self {
            Self::Pending { professional_id } => Some(*professional_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn link_wins_over_decided_marker() {
        // After an accept both facts are recorded; the decoded state is Linked.
        let state =
            Engagement::from_columns(Some(uid(1)), Some(uid(1)), Some(RequestStatus::Accepted));
        assert_eq!(state, Engagement::Linked { professional_id: uid(1) });
    }

    #[test]
    fn pending_decodes_with_target() {
        let state =
            Engagement::from_columns(None, Some(uid(2)), Some(RequestStatus::Pending));
        assert_eq!(state.pending_target(), Some(uid(2)));
        assert!(!state.accepts_new_request());
    }

    #[test]
    fn rejected_marker_accepts_new_request() {
        let state =
            Engagement::from_columns(None, Some(uid(2)), Some(RequestStatus::Rejected));
        assert!(state.accepts_new_request());
        assert_eq!(
            state,
            Engagement::Decided {
                professional_id: uid(2),
                outcome: RequestOutcome::Rejected,
            }
        );
    }

    #[test]
    fn bare_columns_decode_unlinked() {
        let state = Engagement::from_columns(None, None, None);
        assert_eq!(state, Engagement::Unlinked);
        assert!(state.accepts_new_request());
    }
}
