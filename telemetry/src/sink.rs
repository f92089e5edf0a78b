use async_trait::async_trait;
use rider_types::LocationFix;
use serde::{Deserialize, Serialize};

use crate::TelemetryError;

/// Which fixes of a delivered batch the sink accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub acknowledged: Vec<u64>,
}

impl DeliveryReceipt {
    /// Acknowledge every fix in `batch`.
    pub fn all(batch: &[LocationFix]) -> Self {
        Self {
            acknowledged: batch.iter().map(|f| f.sequence_number).collect(),
        }
    }
}

/// Upstream consumer of location fixes.
///
/// Anything not listed in the receipt counts as undelivered and is retried.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn deliver(&self, batch: &[LocationFix]) -> Result<DeliveryReceipt, TelemetryError>;
}
