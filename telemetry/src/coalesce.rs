//! Drops fixes that add nothing over the last kept one.

use rider_types::{distance_meters, LocationSample, Timestamp};
use std::time::Duration;

/// Decides whether a sample is worth a new fix.
///
/// A sample is dropped only when it is both within `min_distance_meters` of
/// the last kept sample and less than `max_silence` after it. A parked rider
/// therefore still produces one fix per `max_silence`.
#[derive(Clone, Debug)]
pub struct FixCoalescer {
    min_distance_meters: f64,
    max_silence: Duration,
    last_kept: Option<(f64, f64, Timestamp)>,
}

impl FixCoalescer {
    pub fn new(min_distance_meters: f64, max_silence: Duration) -> Self {
        Self {
            min_distance_meters,
            max_silence,
            last_kept: None,
        }
    }

    /// Returns true if the sample should be kept. Kept samples become the new
    /// reference point.
    pub fn admit(&mut self, sample: &LocationSample) -> bool {
        if let Some((lat, lon, at)) = self.last_kept {
            let moved = distance_meters(lat, lon, sample.latitude, sample.longitude);
            let quiet_for = at.elapsed_since(sample.captured_at);
            if moved < self.min_distance_meters && quiet_for < self.max_silence {
                return false;
            }
        }
        self.last_kept = Some((sample.latitude, sample.longitude, sample.captured_at));
        true
    }
}
