use thiserror::Error;

/// Errors raised when constructing core values from untrusted input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    #[error("invalid rider id: {0:?}")]
    InvalidRiderId(String),

    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    #[error("accuracy {0} must be a non-negative finite number of meters")]
    InvalidAccuracy(f64),
}
