//! The per-rider capability ledger.

use rider_types::{CapabilityKind, GrantState};
use std::collections::BTreeMap;

use crate::{CapabilitySet, DeviceEvent, PermissionChange};

/// Grant state of every device capability for one rider.
///
/// Mutated only through [`grant`](Self::grant), [`deny`](Self::deny) or
/// [`apply`](Self::apply). Each mutation returns the resulting
/// [`PermissionChange`] as its change notification; replaying an event that
/// does not change the state is a no-op and returns `None`.
pub struct PermissionLedger {
    states: BTreeMap<CapabilityKind, GrantState>,
}

impl PermissionLedger {
    pub fn new() -> Self {
        Self {
            states: BTreeMap::new(),
        }
    }

    /// Record a grant. Returns the change, or `None` if it was already granted.
    pub fn grant(&mut self, capability: CapabilityKind) -> Option<PermissionChange> {
        self.set(capability, GrantState::Granted)
    }

    /// Record a deny. Returns the change, or `None` if it was already denied.
    pub fn deny(&mut self, capability: CapabilityKind) -> Option<PermissionChange> {
        self.set(capability, GrantState::Denied)
    }

    /// Apply an event from the device capability provider.
    pub fn apply(&mut self, event: DeviceEvent) -> Option<PermissionChange> {
        if event.granted {
            self.grant(event.capability)
        } else {
            self.deny(event.capability)
        }
    }

    pub fn state(&self, capability: CapabilityKind) -> GrantState {
        self.states.get(&capability).copied().unwrap_or_default()
    }

    pub fn is_granted(&self, capability: CapabilityKind) -> bool {
        self.state(capability).is_granted()
    }

    /// Whether every capability in `set` is granted. An empty set is trivially granted.
    pub fn all_granted(&self, set: &CapabilitySet) -> bool {
        set.iter().all(|c| self.is_granted(c))
    }

    /// Capabilities from `set` that are not currently granted.
    pub fn missing(&self, set: &CapabilitySet) -> Vec<CapabilityKind> {
        set.iter().filter(|c| !self.is_granted(*c)).collect()
    }

    /// Current state of every capability, including ones never reported.
    pub fn snapshot(&self) -> BTreeMap<CapabilityKind, GrantState> {
        CapabilityKind::ALL
            .into_iter()
            .map(|c| (c, self.state(c)))
            .collect()
    }

    fn set(&mut self, capability: CapabilityKind, next: GrantState) -> Option<PermissionChange> {
        let previous = self.state(capability);
        if previous == next {
            return None;
        }
        self.states.insert(capability, next);
        let change = PermissionChange {
            capability,
            previous,
            current: next,
        };
        tracing::debug!(%capability, ?previous, current = ?next, "capability state changed");
        Some(change)
    }
}

impl Default for PermissionLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_by_default() {
        let ledger = PermissionLedger::new();
        for c in CapabilityKind::ALL {
            assert_eq!(ledger.state(c), GrantState::Unknown);
            assert!(!ledger.is_granted(c));
        }
    }

    #[test]
    fn last_write_wins() {
        let mut ledger = PermissionLedger::new();
        ledger.grant(CapabilityKind::Camera);
        ledger.deny(CapabilityKind::Camera);
        assert_eq!(ledger.state(CapabilityKind::Camera), GrantState::Denied);
        ledger.grant(CapabilityKind::Camera);
        assert!(ledger.is_granted(CapabilityKind::Camera));
    }

    #[test]
    fn replayed_grant_is_silent() {
        let mut ledger = PermissionLedger::new();
        assert!(ledger.grant(CapabilityKind::Location).is_some());
        assert!(ledger.grant(CapabilityKind::Location).is_none());
        assert!(ledger.apply(DeviceEvent::grant(CapabilityKind::Location)).is_none());
    }

    #[test]
    fn all_granted_and_missing() {
        let mut ledger = PermissionLedger::new();
        let required = CapabilitySet::all();
        ledger.grant(CapabilityKind::Camera);
        ledger.grant(CapabilityKind::Location);
        ledger.deny(CapabilityKind::Microphone);
        assert!(!ledger.all_granted(&required));
        assert_eq!(
            ledger.missing(&required),
            vec![CapabilityKind::Microphone, CapabilityKind::Storage]
        );

        let camera_only: CapabilitySet = [CapabilityKind::Camera].into_iter().collect();
        assert!(ledger.all_granted(&camera_only));
        assert!(ledger.all_granted(&CapabilitySet::new()));
    }

    #[test]
    fn changes_report_previous_and_current_state() {
        let mut ledger = PermissionLedger::new();
        let first = ledger.grant(CapabilityKind::Camera).unwrap();
        assert_eq!(first.capability, CapabilityKind::Camera);
        assert_eq!(first.previous, GrantState::Unknown);
        assert_eq!(first.current, GrantState::Granted);
        assert!(ledger.grant(CapabilityKind::Camera).is_none());

        let second = ledger.deny(CapabilityKind::Camera).unwrap();
        assert_eq!(second.previous, GrantState::Granted);
        assert_eq!(second.current, GrantState::Denied);
    }

    #[test]
    fn snapshot_covers_every_capability() {
        let mut ledger = PermissionLedger::new();
        ledger.grant(CapabilityKind::Storage);
        let snap = ledger.snapshot();
        assert_eq!(snap.len(), 4);
        assert_eq!(snap[&CapabilityKind::Storage], GrantState::Granted);
        assert_eq!(snap[&CapabilityKind::Camera], GrantState::Unknown);
    }
}
