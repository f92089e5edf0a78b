use rider_types::RetryPolicy;
use std::time::Duration;

use crate::buffer::DEFAULT_BUFFER_CAPACITY;

/// Reporter tuning. Cadence and dedup thresholds are deployment choices.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryConfig {
    pub sample_interval: Duration,
    /// Bound on a single location provider call.
    pub sample_timeout: Duration,
    /// A fix closer than this to the last kept fix is a duplicate...
    pub min_distance_meters: f64,
    /// ...unless this much time has passed since the last kept fix.
    pub max_silence: Duration,
    /// Samples less accurate than this are discarded.
    pub max_accuracy_meters: f64,
    pub buffer_capacity: usize,
    /// Fixes sent per sink call.
    pub batch_size: usize,
    /// Bound on a single sink call.
    pub delivery_timeout: Duration,
    pub delivery_retry: RetryPolicy,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(5),
            sample_timeout: Duration::from_secs(2),
            min_distance_meters: 10.0,
            max_silence: Duration::from_secs(60),
            max_accuracy_meters: 100.0,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            batch_size: 50,
            delivery_timeout: Duration::from_secs(5),
            delivery_retry: RetryPolicy::default(),
        }
    }
}
