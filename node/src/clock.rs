//! Wall-clock time driven by the tokio runtime.

use rider_types::{Clock, Timestamp};
use tokio::time::Instant;

/// A clock anchored to a wall-clock reading and advanced by tokio's
/// monotonic clock.
///
/// Deadlines and sleeps both run on tokio time, so pausing or advancing the
/// runtime clock in tests moves session expiry with it.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeClock {
    anchor: Timestamp,
    started: Instant,
}

impl RuntimeClock {
    /// Must be created inside a tokio runtime.
    pub fn new() -> Self {
        Self::anchored_at(Timestamp::now())
    }

    pub fn anchored_at(anchor: Timestamp) -> Self {
        Self {
            anchor,
            started: Instant::now(),
        }
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RuntimeClock {
    fn now(&self) -> Timestamp {
        self.anchor.plus(self.started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn follows_paused_runtime_time() {
        let clock = RuntimeClock::anchored_at(Timestamp::from_secs(1_000));
        assert_eq!(clock.now(), Timestamp::from_secs(1_000));
        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), Timestamp::from_secs(1_090));
    }
}
