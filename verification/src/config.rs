use rider_permissions::CapabilitySet;
use std::time::Duration;

/// State machine tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationConfig {
    /// Costed capture failures plus non-matches allowed before rejection.
    pub max_attempts: u32,
    /// Lifetime of a session from creation to forced expiry.
    pub session_ttl: Duration,
    /// Extra match submissions of the same bundle after `matcher_unavailable`.
    pub matcher_unavailable_retries: u32,
    /// Capabilities that must be granted before capture starts.
    pub required_capabilities: CapabilitySet,
    /// Confidence a `matched` result needs to approve. Checked again here even
    /// though the match client already normalizes.
    pub approval_threshold: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            session_ttl: Duration::from_secs(30 * 60),
            matcher_unavailable_retries: 2,
            required_capabilities: CapabilitySet::all(),
            approval_threshold: 0.85,
        }
    }
}
