use async_trait::async_trait;
use rider_types::LocationSample;

use crate::TelemetryError;

/// The device's location source, polled once per sampling tick.
///
/// Return [`TelemetryError::LocationUnavailable`] when there is no fix; the
/// reporter skips the tick. Calls are bounded by the sample timeout.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_fix(&self) -> Result<LocationSample, TelemetryError>;
}
