//! The biometric matcher seam.

use async_trait::async_trait;
use rider_types::{EvidenceBundle, ImageRef, MatchOutcome};
use serde::{Deserialize, Serialize};

use crate::MatcherError;

/// What the matcher receives: the two image references, nothing else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub document_image: ImageRef,
    pub face_image: ImageRef,
}

impl From<&EvidenceBundle> for MatchRequest {
    fn from(bundle: &EvidenceBundle) -> Self {
        Self {
            document_image: bundle.document().clone(),
            face_image: bundle.face().clone(),
        }
    }
}

/// The matcher's raw answer, before threshold normalization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatcherResponse {
    pub outcome: MatchOutcome,
    pub confidence_score: f64,
}

/// A vendor biometric comparison service.
///
/// Transport and encoding are the implementation's concern. The client only
/// needs request/response semantics; it applies its own timeout around the call.
#[async_trait]
pub trait BiometricMatcher: Send + Sync {
    async fn compare(&self, request: &MatchRequest) -> Result<MatcherResponse, MatcherError>;
}
