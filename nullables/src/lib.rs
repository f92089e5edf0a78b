//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the pipeline (clock, camera, biometric
//! matcher, location provider, telemetry sink) sits behind a trait. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be scripted and inspected programmatically
//! - Never touch hardware or the network
//!
//! Usage: swap real implementations for nullables in tests and simulations.

pub mod camera;
pub mod clock;
pub mod location;
pub mod matcher;
pub mod sink;

pub use camera::{CameraStep, NullCamera};
pub use clock::NullClock;
pub use location::NullLocation;
pub use matcher::{MatcherStep, NullMatcher};
pub use sink::NullSink;

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, ignoring poisoning. A test that panicked while holding the
/// lock has already failed.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
