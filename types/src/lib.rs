//! Fundamental types for the rider verification pipeline.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! rider identities, timestamps and clocks, device capabilities, evidence
//! envelopes, match results, location fixes, and the retry/backoff shape used by
//! every outbound call.

pub mod capability;
pub mod error;
pub mod evidence;
pub mod location;
pub mod matching;
pub mod retry;
pub mod rider;
pub mod time;

pub use capability::{CapabilityKind, GrantState};
pub use error::TypesError;
pub use evidence::{EvidenceBundle, ImageKind, ImageRef};
pub use location::{distance_meters, LocationFix, LocationSample};
pub use matching::{MatchOutcome, MatchResult};
pub use retry::RetryPolicy;
pub use rider::RiderId;
pub use time::{Clock, SystemClock, Timestamp};
