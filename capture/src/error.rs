use rider_types::CapabilityKind;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capability {0} is not granted")]
    PermissionDenied(CapabilityKind),

    #[error("capture hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("capture cancelled by the rider")]
    UserCancelled,

    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),
}

impl CaptureError {
    /// Whether this failure consumes one of the session's capture attempts.
    ///
    /// Rider-actionable failures (cancel, missing permission) are free.
    pub fn costs_attempt(&self) -> bool {
        matches!(self, Self::HardwareUnavailable(_) | Self::InvalidEvidence(_))
    }
}
