//! Nullable telemetry sink: records deliveries instead of sending them.

use async_trait::async_trait;
use rider_telemetry::{DeliveryReceipt, TelemetryError, TelemetrySink};
use rider_types::LocationFix;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::lock;

#[derive(Debug, Default)]
pub struct NullSink {
    down: AtomicBool,
    delivered: Mutex<Vec<LocationFix>>,
    calls: AtomicU32,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// While down, every delivery fails.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<LocationFix> {
        lock(&self.delivered).clone()
    }

    pub fn sequence_numbers(&self) -> Vec<u64> {
        lock(&self.delivered)
            .iter()
            .map(|f| f.sequence_number)
            .collect()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetrySink for NullSink {
    async fn deliver(&self, batch: &[LocationFix]) -> Result<DeliveryReceipt, TelemetryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(TelemetryError::Delivery("sink offline".into()));
        }
        lock(&self.delivered).extend_from_slice(batch);
        Ok(DeliveryReceipt::all(batch))
    }
}
