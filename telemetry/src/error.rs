use rider_types::TypesError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("location sample timed out after {0:?}")]
    SampleTimeout(Duration),

    #[error("invalid location sample: {0}")]
    InvalidSample(#[from] TypesError),

    #[error("sample accuracy {accuracy}m exceeds {limit}m")]
    InaccurateSample { accuracy: f64, limit: f64 },

    #[error("sink rejected delivery: {0}")]
    Delivery(String),

    #[error("delivery timed out after {0:?}")]
    DeliveryTimeout(Duration),

    #[error("sink acknowledged {acked} of {sent} fixes")]
    PartialAck { acked: usize, sent: usize },
}
