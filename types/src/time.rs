//! Timestamp type and clock abstraction used throughout the pipeline.
//!
//! Timestamps are Unix epoch milliseconds (UTC). Session deadlines, match
//! results, and location fixes all carry one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A Unix timestamp in milliseconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A system clock set before the Unix epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        self.0 / 1000
    }

    /// This timestamp shifted forward by `duration`, saturating at `u64::MAX`.
    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// Time elapsed from this timestamp until `now` (zero if `now` is earlier).
    pub fn elapsed_since(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.0.saturating_sub(self.0))
    }

    /// Time remaining from `now` until this timestamp (zero if already passed).
    pub fn remaining_from(&self, now: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(now.0))
    }

    /// Whether this timestamp has been reached relative to `now`.
    pub fn has_passed(&self, now: Timestamp) -> bool {
        now.0 >= self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of the current time.
///
/// Components that stamp or compare times take a `Clock` instead of calling
/// [`Timestamp::now`] so tests can drive time deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_and_remaining_are_consistent() {
        let t = Timestamp::from_secs(10);
        let deadline = t.plus(Duration::from_secs(5));
        assert_eq!(deadline.as_millis(), 15_000);
        assert_eq!(deadline.remaining_from(t), Duration::from_secs(5));
        assert_eq!(t.remaining_from(deadline), Duration::ZERO);
    }

    #[test]
    fn has_passed_is_inclusive() {
        let deadline = Timestamp::from_millis(1_000);
        assert!(!deadline.has_passed(Timestamp::from_millis(999)));
        assert!(deadline.has_passed(Timestamp::from_millis(1_000)));
        assert!(deadline.has_passed(Timestamp::from_millis(1_001)));
    }

    #[test]
    fn elapsed_saturates() {
        let later = Timestamp::from_millis(500);
        assert_eq!(later.elapsed_since(Timestamp::EPOCH), Duration::ZERO);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now() > Timestamp::EPOCH);
    }
}
