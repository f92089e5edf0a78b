//! Capture coordinator.
//!
//! Asks the device capture provider for a document image and a live face
//! image, enforces basic quality limits, and packages an [`EvidenceBundle`].
//! The coordinator holds no state between calls and never retries; failures go
//! back to the verification state machine, which owns the retry policy.
//!
//! [`EvidenceBundle`]: rider_types::EvidenceBundle

pub mod coordinator;
pub mod error;
pub mod limits;
pub mod provider;

pub use coordinator::CaptureCoordinator;
pub use error::CaptureError;
pub use limits::CaptureLimits;
pub use provider::{CaptureProvider, ProviderError};
