//! Timeout, retry, and normalization around a [`BiometricMatcher`].

use rand::Rng;
use rider_types::{Clock, EvidenceBundle, MatchOutcome, MatchResult};
use std::sync::Arc;

use crate::{BiometricMatcher, MatchConfig, MatchRequest, MatcherError, MatcherResponse};

/// How one attempt ended.
enum Attempt {
    /// A final answer; stop retrying.
    Final(MatchResult),
    /// Timeout, transport error, or the matcher said it was unavailable.
    Transient(MatcherError),
}

/// Submits evidence bundles to the matcher.
///
/// `submit` never fails: exhausting every attempt yields a
/// `matcher_unavailable` result that the state machine acts on.
pub struct MatchClient {
    matcher: Arc<dyn BiometricMatcher>,
    config: MatchConfig,
    clock: Arc<dyn Clock>,
}

impl MatchClient {
    pub fn new(matcher: Arc<dyn BiometricMatcher>, config: MatchConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            matcher,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Submit a bundle and wait for a normalized result.
    ///
    /// Up to `1 + retry.max_retries` attempts, each bounded by `timeout`, with
    /// jittered exponential backoff between them. A spoof verdict returns at
    /// once without retrying.
    pub async fn submit(&self, bundle: &EvidenceBundle) -> MatchResult {
        let request = MatchRequest::from(bundle);
        let policy = self.config.retry;

        for attempt in 0..policy.max_attempts() {
            if attempt > 0 {
                let sample: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
                let delay = policy.delay_for(attempt, sample);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before matcher retry");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&request).await {
                Attempt::Final(result) => {
                    tracing::info!(
                        attempt,
                        outcome = %result.outcome(),
                        confidence = result.confidence_score(),
                        "matcher answered"
                    );
                    return result;
                }
                Attempt::Transient(err) => {
                    tracing::warn!(attempt, error = %err, "matcher attempt failed");
                }
            }
        }

        tracing::warn!(attempts = policy.max_attempts(), "matcher unavailable after all attempts");
        MatchResult::unavailable(self.clock.now())
    }

    async fn attempt(&self, request: &MatchRequest) -> Attempt {
        match tokio::time::timeout(self.config.timeout, self.matcher.compare(request)).await {
            Err(_) => Attempt::Transient(MatcherError::Timeout(self.config.timeout)),
            Ok(Err(err)) => Attempt::Transient(err),
            Ok(Ok(response)) => match self.normalize(response) {
                Some(result) => Attempt::Final(result),
                None => Attempt::Transient(MatcherError::Unavailable),
            },
        }
    }

    /// Apply the confidence threshold. `None` means the matcher reported
    /// itself unavailable and the attempt should be retried.
    fn normalize(&self, response: MatcherResponse) -> Option<MatchResult> {
        let now = self.clock.now();
        let score = response.confidence_score;
        let well_formed = score.is_finite() && (0.0..=1.0).contains(&score);

        let outcome = match response.outcome {
            MatchOutcome::MatcherUnavailable => return None,
            MatchOutcome::SpoofSuspected => MatchOutcome::SpoofSuspected,
            MatchOutcome::Matched if well_formed && score >= self.config.confidence_threshold => {
                MatchOutcome::Matched
            }
            MatchOutcome::Matched | MatchOutcome::NotMatched => MatchOutcome::NotMatched,
        };
        Some(MatchResult::new(outcome, score, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rider_types::{ImageKind, ImageRef, SystemClock, Timestamp};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers from a script; `None` entries hang until the client times out.
    struct ScriptedMatcher {
        script: Mutex<VecDeque<Option<Result<MatcherResponse, MatcherError>>>>,
        calls: AtomicU32,
    }

    impl ScriptedMatcher {
        fn new(script: Vec<Option<Result<MatcherResponse, MatcherError>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl BiometricMatcher for ScriptedMatcher {
        async fn compare(&self, _request: &MatchRequest) -> Result<MatcherResponse, MatcherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front().flatten();
            match next {
                Some(answer) => answer,
                None => std::future::pending().await,
            }
        }
    }

    fn answer(outcome: MatchOutcome, confidence_score: f64) -> Option<Result<MatcherResponse, MatcherError>> {
        Some(Ok(MatcherResponse {
            outcome,
            confidence_score,
        }))
    }

    fn bundle() -> EvidenceBundle {
        let img = |kind| ImageRef {
            id: format!("{kind}"),
            kind,
            byte_len: 10,
            width: 640,
            height: 480,
        };
        EvidenceBundle::new(img(ImageKind::Document), img(ImageKind::Face), Timestamp::EPOCH)
    }

    fn client(matcher: Arc<ScriptedMatcher>) -> MatchClient {
        MatchClient::new(matcher, MatchConfig::default(), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn high_confidence_match_is_matched() {
        let m = ScriptedMatcher::new(vec![answer(MatchOutcome::Matched, 0.93)]);
        let result = client(m.clone()).submit(&bundle()).await;
        assert_eq!(result.outcome(), MatchOutcome::Matched);
        assert_eq!(m.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn below_threshold_is_normalized_to_not_matched() {
        let m = ScriptedMatcher::new(vec![answer(MatchOutcome::Matched, 0.60)]);
        let result = client(m).submit(&bundle()).await;
        assert_eq!(result.outcome(), MatchOutcome::NotMatched);
        assert!((result.confidence_score() - 0.60).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn malformed_confidence_never_matches() {
        let m = ScriptedMatcher::new(vec![answer(MatchOutcome::Matched, 1.5)]);
        assert_eq!(client(m).submit(&bundle()).await.outcome(), MatchOutcome::NotMatched);

        let m = ScriptedMatcher::new(vec![answer(MatchOutcome::Matched, f64::NAN)]);
        assert_eq!(client(m).submit(&bundle()).await.outcome(), MatchOutcome::NotMatched);
    }

    #[tokio::test]
    async fn spoof_returns_without_retry() {
        let m = ScriptedMatcher::new(vec![
            answer(MatchOutcome::SpoofSuspected, 0.99),
            answer(MatchOutcome::Matched, 0.99),
        ]);
        let result = client(m.clone()).submit(&bundle()).await;
        assert_eq!(result.outcome(), MatchOutcome::SpoofSuspected);
        assert_eq!(m.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn three_timeouts_yield_unavailable() {
        let m = ScriptedMatcher::new(vec![None, None, None]);
        let started = tokio::time::Instant::now();
        let result = client(m.clone()).submit(&bundle()).await;
        assert_eq!(result.outcome(), MatchOutcome::MatcherUnavailable);
        assert_eq!(m.calls.load(Ordering::SeqCst), 3);

        // 3 × 10s timeouts plus ~1s and ~2s of backoff, each within ±20%.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(32_400), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(33_600), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let m = ScriptedMatcher::new(vec![
            Some(Err(MatcherError::Transport("reset".into()))),
            answer(MatchOutcome::MatcherUnavailable, 0.0),
            answer(MatchOutcome::Matched, 0.90),
        ]);
        let result = client(m.clone()).submit(&bundle()).await;
        assert_eq!(result.outcome(), MatchOutcome::Matched);
        assert_eq!(m.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_threshold_applies() {
        let m = ScriptedMatcher::new(vec![answer(MatchOutcome::Matched, 0.7)]);
        let config = MatchConfig {
            confidence_threshold: 0.65,
            ..MatchConfig::default()
        };
        let c = MatchClient::new(m, config, Arc::new(SystemClock));
        assert_eq!(c.submit(&bundle()).await.outcome(), MatchOutcome::Matched);
    }
}
