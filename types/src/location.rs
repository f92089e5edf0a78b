//! Location samples from the device and the sequenced fixes sent to the sink.

use serde::{Deserialize, Serialize};

use crate::{RiderId, Timestamp, TypesError};

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A raw position reading as produced by the location provider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub captured_at: Timestamp,
}

impl LocationSample {
    /// Check coordinate ranges and accuracy.
    pub fn validate(&self) -> Result<(), TypesError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(TypesError::InvalidLatitude(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(TypesError::InvalidLongitude(self.longitude));
        }
        if !self.accuracy_meters.is_finite() || self.accuracy_meters < 0.0 {
            return Err(TypesError::InvalidAccuracy(self.accuracy_meters));
        }
        Ok(())
    }
}

/// A sampled position stamped with the rider and a per-rider sequence number.
///
/// Sequence numbers are assigned by the telemetry reporter and let the sink
/// deduplicate and order fixes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub rider_id: RiderId,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub captured_at: Timestamp,
    pub sequence_number: u64,
}

impl LocationFix {
    pub fn from_sample(rider_id: RiderId, sample: &LocationSample, sequence_number: u64) -> Self {
        Self {
            rider_id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy_meters: sample.accuracy_meters,
            captured_at: sample.captured_at,
            sequence_number,
        }
    }
}

/// Great-circle (haversine) distance between two points in meters.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}
