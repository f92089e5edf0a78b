//! Permission ledger.
//!
//! Tracks which device capabilities a rider has granted. Pure state: the
//! device layer feeds grant/deny events in, the verification state machine and
//! telemetry reporter read the result. Every mutation returns the
//! [`PermissionChange`] it caused, which the session actor uses to re-evaluate
//! gated transitions.

pub mod events;
pub mod ledger;
pub mod set;

pub use events::{DeviceEvent, PermissionChange};
pub use ledger::PermissionLedger;
pub use set::CapabilitySet;
