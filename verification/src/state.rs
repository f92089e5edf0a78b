//! Verification session state.

use rider_types::{EvidenceBundle, MatchOutcome, MatchResult, RiderId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    /// Just instantiated; permissions not yet evaluated.
    Created,
    /// Waiting for the rider to grant every required capability.
    PermissionsPending,
    /// Document and face capture in progress.
    CapturingEvidence,
    /// Evidence submitted; waiting for the matcher.
    AwaitingMatch,
    /// Identity confirmed. The rider may work.
    Approved,
    Rejected(RejectionReason),
    /// The session deadline passed before a decision.
    Expired,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected(_) | Self::Expired)
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            Self::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PermissionsPending => "permissions_pending",
            Self::CapturingEvidence => "capturing_evidence",
            Self::AwaitingMatch => "awaiting_match",
            Self::Approved => "approved",
            Self::Rejected(_) => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "rejected({reason})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Why a session ended in `Rejected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Capture kept failing until the attempt budget ran out.
    EvidenceUnobtainable,
    /// Face and document did not match within the attempt budget.
    MatchFailed,
    /// The matcher flagged a presentation attack.
    SpoofDetected,
    /// The matcher could not be reached.
    MatcherUnavailable,
    /// An operator withdrew a previous approval.
    Revoked,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvidenceUnobtainable => "evidence_unobtainable",
            Self::MatchFailed => "match_failed",
            Self::SpoofDetected => "spoof_detected",
            Self::MatcherUnavailable => "matcher_unavailable",
            Self::Revoked => "revoked",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What triggered a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    SessionCreated,
    PermissionsEvaluated,
    CaptureFailed(String),
    EvidenceCaptured,
    MatchAnswered(MatchOutcome),
    DeadlineReached,
    Revoked,
}

/// One entry in a session's transition history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SessionState,
    pub to: SessionState,
    pub at: Timestamp,
    pub cause: TransitionCause,
}

/// Verification state for one rider.
///
/// Only the state machine mutates a session; everyone else works with clones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub(crate) rider_id: RiderId,
    pub(crate) state: SessionState,
    pub(crate) evidence_bundle: Option<EvidenceBundle>,
    pub(crate) match_result: Option<MatchResult>,
    pub(crate) attempt_count: u32,
    /// `matcher_unavailable` answers seen for the current bundle.
    pub(crate) matcher_retries: u32,
    pub(crate) created_at: Timestamp,
    pub(crate) last_transition_at: Timestamp,
    pub(crate) expires_at: Timestamp,
    pub(crate) history: Vec<TransitionRecord>,
}

impl VerificationSession {
    pub fn rider_id(&self) -> &RiderId {
        &self.rider_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        self.state.rejection_reason()
    }

    pub fn evidence_bundle(&self) -> Option<&EvidenceBundle> {
        self.evidence_bundle.as_ref()
    }

    pub fn match_result(&self) -> Option<&MatchResult> {
        self.match_result.as_ref()
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn matcher_retries(&self) -> u32 {
        self.matcher_retries
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_transition_at(&self) -> Timestamp {
        self.last_transition_at
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
