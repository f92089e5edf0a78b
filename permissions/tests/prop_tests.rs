use proptest::prelude::*;

use rider_permissions::{DeviceEvent, PermissionLedger};
use rider_types::CapabilityKind;

fn capability() -> impl Strategy<Value = CapabilityKind> {
    prop::sample::select(CapabilityKind::ALL.to_vec())
}

fn event() -> impl Strategy<Value = DeviceEvent> {
    (capability(), any::<bool>()).prop_map(|(capability, granted)| DeviceEvent {
        capability,
        granted,
    })
}

proptest! {
    /// Replaying any event right after it was applied leaves the ledger unchanged.
    #[test]
    fn replay_is_idempotent(events in prop::collection::vec(event(), 1..40)) {
        let mut ledger = PermissionLedger::new();
        for e in events {
            ledger.apply(e);
            let before = ledger.snapshot();
            prop_assert!(ledger.apply(e).is_none());
            prop_assert_eq!(ledger.snapshot(), before);
        }
    }

    /// The final state of each capability is the last event reported for it.
    #[test]
    fn last_write_wins(events in prop::collection::vec(event(), 1..40)) {
        let mut ledger = PermissionLedger::new();
        for e in &events {
            ledger.apply(*e);
        }
        for c in CapabilityKind::ALL {
            if let Some(last) = events.iter().rev().find(|e| e.capability == c) {
                prop_assert_eq!(ledger.is_granted(c), last.granted);
            }
        }
    }
}
