//! Normalized biometric match results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Timestamp;

/// Outcome of comparing a document photo with a live face capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched,
    NotMatched,
    SpoofSuspected,
    MatcherUnavailable,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Matched => "matched",
            Self::NotMatched => "not_matched",
            Self::SpoofSuspected => "spoof_suspected",
            Self::MatcherUnavailable => "matcher_unavailable",
        };
        f.write_str(s)
    }
}

/// The result of one match attempt for one evidence bundle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    outcome: MatchOutcome,
    confidence_score: f64,
    matched_at: Timestamp,
}

impl MatchResult {
    /// Build a result. The confidence is clamped into `[0.0, 1.0]`; NaN reads as 0.
    pub fn new(outcome: MatchOutcome, confidence_score: f64, matched_at: Timestamp) -> Self {
        let confidence_score = if confidence_score.is_nan() {
            0.0
        } else {
            confidence_score.clamp(0.0, 1.0)
        };
        Self {
            outcome,
            confidence_score,
            matched_at,
        }
    }

    /// A result recording that the matcher could not be reached.
    pub fn unavailable(at: Timestamp) -> Self {
        Self::new(MatchOutcome::MatcherUnavailable, 0.0, at)
    }

    pub fn outcome(&self) -> MatchOutcome {
        self.outcome
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn matched_at(&self) -> Timestamp {
        self.matched_at
    }

    /// Whether this result is sufficient for approval at the given threshold.
    pub fn qualifies(&self, threshold: f64) -> bool {
        self.outcome == MatchOutcome::Matched && self.confidence_score >= threshold
    }
}
