//! Retry-with-backoff shape shared by the match client and the telemetry sink.

use std::time::Duration;

/// Exponential backoff with symmetric jitter.
///
/// Attempt `0` is the initial call. Retry `n` (1-based) waits
/// `base * factor^(n-1)`, scaled by `1 + jitter * sample` where `sample` is
/// drawn by the caller from `[-1.0, 1.0]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub base: Duration,
    pub factor: u32,
    /// Jitter fraction in `[0.0, 1.0)`; 0.2 means ±20%.
    pub jitter: f64,
}

impl RetryPolicy {
    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based). Retry 0 has no delay.
    pub fn delay_for(&self, retry: u32, jitter_sample: f64) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exp = self.factor.max(1).saturating_pow(retry - 1);
        let nominal = self.base.saturating_mul(exp);
        let sample = if jitter_sample.is_finite() {
            jitter_sample.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let scale = (1.0 + self.jitter.clamp(0.0, 0.99) * sample).max(0.0);
        nominal.mul_f64(scale)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base: Duration::from_secs(1),
            factor: 2,
            jitter: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_one_then_two_seconds() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts(), 3);
        assert_eq!(p.delay_for(0, 0.0), Duration::ZERO);
        assert_eq!(p.delay_for(1, 0.0), Duration::from_secs(1));
        assert_eq!(p.delay_for(2, 0.0), Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_within_band() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(2, 1.0), Duration::from_millis(2400));
        assert_eq!(p.delay_for(2, -1.0), Duration::from_millis(1600));
        // Out-of-range samples are clamped.
        assert_eq!(p.delay_for(2, 5.0), Duration::from_millis(2400));
    }
}
