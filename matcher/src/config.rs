use rider_types::RetryPolicy;
use std::time::Duration;

/// Match client tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchConfig {
    /// Per-attempt deadline.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Minimum confidence for a `matched` answer to count as a match.
    pub confidence_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            confidence_threshold: 0.85,
        }
    }
}
