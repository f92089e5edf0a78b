//! Rider identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Opaque identifier of a rider, as issued by the platform account system.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RiderId(String);

impl RiderId {
    /// Create a rider id from a raw string.
    ///
    /// Fails if the string is empty or only whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(TypesError::InvalidRiderId(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RiderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
