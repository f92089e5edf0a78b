//! Device capabilities a rider must grant before onboarding.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A device capability gated by the operating system permission dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Camera,
    Microphone,
    Location,
    Storage,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 4] = [
        CapabilityKind::Camera,
        CapabilityKind::Microphone,
        CapabilityKind::Location,
        CapabilityKind::Storage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::Location => "location",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grant state of a single capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
    /// No grant or deny event has been observed yet.
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl GrantState {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}
