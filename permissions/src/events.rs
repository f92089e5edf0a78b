//! Events into and out of the permission ledger.

use rider_types::{CapabilityKind, GrantState};
use serde::{Deserialize, Serialize};

/// A grant or deny reported by the device capability provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub capability: CapabilityKind,
    pub granted: bool,
}

impl DeviceEvent {
    pub fn grant(capability: CapabilityKind) -> Self {
        Self {
            capability,
            granted: true,
        }
    }

    pub fn deny(capability: CapabilityKind) -> Self {
        Self {
            capability,
            granted: false,
        }
    }
}

/// Notification that a capability's grant state changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PermissionChange {
    pub capability: CapabilityKind,
    pub previous: GrantState,
    pub current: GrantState,
}
