//! The device capture provider seam.

use async_trait::async_trait;
use rider_types::{ImageKind, ImageRef};
use thiserror::Error;

/// Failure reported by the device capture layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("cancelled by user")]
    UserCancelled,
}

/// Camera access owned by the device layer.
///
/// `capture_image` may block for as long as the rider takes to frame the
/// shot; the coordinator bounds it with a timeout.
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn capture_image(&self, kind: ImageKind) -> Result<ImageRef, ProviderError>;
}
