//! Nullable location provider: a synthetic route.

use async_trait::async_trait;
use rider_telemetry::{LocationProvider, TelemetryError};
use rider_types::{Clock, LocationSample};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Meters per degree of latitude, close enough for synthetic routes.
const METERS_PER_DEGREE: f64 = 111_195.0;

/// Walks north from a start point by a fixed step per sample.
///
/// A zero step models a parked rider. Samples are stamped with the given clock.
pub struct NullLocation {
    start: (f64, f64),
    step_meters: f64,
    accuracy_meters: f64,
    clock: Arc<dyn Clock>,
    samples: AtomicU64,
    available: AtomicBool,
}

impl NullLocation {
    pub fn moving(clock: Arc<dyn Clock>, step_meters: f64) -> Self {
        Self {
            start: (48.8566, 2.3522),
            step_meters,
            accuracy_meters: 5.0,
            clock,
            samples: AtomicU64::new(0),
            available: AtomicBool::new(true),
        }
    }

    pub fn stationary(clock: Arc<dyn Clock>) -> Self {
        Self::moving(clock, 0.0)
    }

    pub fn with_accuracy(mut self, accuracy_meters: f64) -> Self {
        self.accuracy_meters = accuracy_meters;
        self
    }

    /// Toggle signal loss.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Samples handed out so far.
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for NullLocation {
    async fn current_fix(&self) -> Result<LocationSample, TelemetryError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TelemetryError::LocationUnavailable("signal lost".into()));
        }
        let n = self.samples.fetch_add(1, Ordering::SeqCst);
        Ok(LocationSample {
            latitude: self.start.0 + n as f64 * self.step_meters / METERS_PER_DEGREE,
            longitude: self.start.1,
            accuracy_meters: self.accuracy_meters,
            captured_at: self.clock.now(),
        })
    }
}
