use std::time::Duration;
use thiserror::Error;

/// Failure talking to the biometric matcher. Every variant is treated as transient.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatcherError {
    #[error("matcher transport error: {0}")]
    Transport(String),

    #[error("matcher did not answer within {0:?}")]
    Timeout(Duration),

    #[error("matcher reported itself unavailable")]
    Unavailable,
}
