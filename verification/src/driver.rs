//! Async host for the state machine.
//!
//! [`SessionDriver`] performs the capture and match steps the machine asks for
//! and feeds their outcomes back in. Every step is bounded by the time left
//! until the session deadline, so a stuck provider can never hold a session
//! past `expires_at`.

use rider_capture::{CaptureCoordinator, CaptureError};
use rider_matcher::MatchClient;
use rider_permissions::PermissionLedger;
use rider_types::{Clock, EvidenceBundle};
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

use crate::machine::NextStep;
use crate::{
    SessionState, VerificationError, VerificationEvent, VerificationSession,
    VerificationStateMachine,
};

pub struct SessionDriver {
    machine: VerificationStateMachine,
    capture: Arc<CaptureCoordinator>,
    matcher: Arc<MatchClient>,
    clock: Arc<dyn Clock>,
}

impl SessionDriver {
    pub fn new(
        machine: VerificationStateMachine,
        capture: Arc<CaptureCoordinator>,
        matcher: Arc<MatchClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            machine,
            capture,
            matcher,
            clock,
        }
    }

    pub fn session(&self) -> &VerificationSession {
        self.machine.session()
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub fn drain_events(&mut self) -> Vec<VerificationEvent> {
        self.machine.drain_events()
    }

    /// Run capture and match steps until the session is terminal or waiting
    /// on the rider.
    pub async fn advance(&mut self, ledger: &PermissionLedger) -> SessionState {
        loop {
            let now = self.clock.now();
            if self.machine.expire_if_due(now) {
                break;
            }
            let result = match self.machine.next_step() {
                NextStep::EvaluatePermissions => self.machine.evaluate_permissions(ledger, now),
                NextStep::Capture => self.capture_step(ledger).await,
                NextStep::Match(bundle) => self.match_step(bundle).await,
                NextStep::WaitForRider | NextStep::Done => break,
            };
            if let Err(err) = result {
                tracing::error!(rider = %self.session().rider_id(), error = %err, "step rejected by state machine");
                break;
            }
        }
        self.machine.state()
    }

    /// Re-check permissions after a capability change or an explicit resume,
    /// then continue.
    pub async fn resume(&mut self, ledger: &PermissionLedger) -> SessionState {
        let now = self.clock.now();
        match self.machine.state() {
            SessionState::Created | SessionState::PermissionsPending => {
                if let Err(err) = self.machine.evaluate_permissions(ledger, now) {
                    tracing::debug!(error = %err, "resume ignored");
                }
            }
            _ => {
                self.machine.expire_if_due(now);
            }
        }
        self.advance(ledger).await
    }

    /// Force `Expired` if the deadline has passed.
    pub fn check_deadline(&mut self) -> bool {
        self.machine.expire_if_due(self.clock.now())
    }

    pub fn revoke(&mut self) -> Result<SessionState, VerificationError> {
        self.machine.revoke(self.clock.now())
    }

    async fn capture_step(&mut self, ledger: &PermissionLedger) -> Result<SessionState, VerificationError> {
        let span = tracing::info_span!("capture", rider = %self.session().rider_id());
        let capture = Arc::clone(&self.capture);
        let captured = self
            .bounded(
                async move {
                    let document = capture.capture_document(ledger).await?;
                    let face = capture.capture_face(ledger).await?;
                    capture.build_bundle(document, face)
                }
                .instrument(span),
            )
            .await;

        let now = self.clock.now();
        match captured {
            None => {
                self.machine.expire(now);
                Ok(self.machine.state())
            }
            Some(Ok(bundle)) => self.machine.record_evidence(bundle, now),
            Some(Err(err)) => self.record_capture_failure(err),
        }
    }

    fn record_capture_failure(&mut self, err: CaptureError) -> Result<SessionState, VerificationError> {
        let now = self.clock.now();
        self.machine.record_capture_failure(&err, now)
    }

    async fn match_step(&mut self, bundle: EvidenceBundle) -> Result<SessionState, VerificationError> {
        let span = tracing::info_span!(
            "match",
            rider = %self.session().rider_id(),
            attempt = self.session().attempt_count()
        );
        let matcher = Arc::clone(&self.matcher);
        let answered = self
            .bounded(async move { matcher.submit(&bundle).await }.instrument(span))
            .await;

        let now = self.clock.now();
        match answered {
            None => {
                self.machine.expire(now);
                Ok(self.machine.state())
            }
            Some(result) => self.machine.record_match(result, now),
        }
    }

    /// Run `step` until it finishes or the session deadline arrives.
    async fn bounded<T>(&self, step: impl Future<Output = T>) -> Option<T> {
        let remaining = self.session().expires_at().remaining_from(self.clock.now());
        tokio::time::timeout(remaining, step).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RejectionReason, VerificationConfig};
    use async_trait::async_trait;
    use rider_capture::{CaptureLimits, CaptureProvider, ProviderError};
    use rider_matcher::{BiometricMatcher, MatchConfig, MatchRequest, MatcherError, MatcherResponse};
    use rider_types::{CapabilityKind, ImageKind, ImageRef, MatchOutcome, RiderId, Timestamp};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Reads tokio's (pausable) clock.
    struct TokioClock(tokio::time::Instant);

    impl Clock for TokioClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.0.elapsed().as_millis() as u64)
        }
    }

    /// Camera that replays a script, then keeps answering with good images.
    #[derive(Default)]
    struct ScriptedCamera(Mutex<VecDeque<Result<(), ProviderError>>>);

    #[async_trait]
    impl CaptureProvider for ScriptedCamera {
        async fn capture_image(&self, kind: ImageKind) -> Result<ImageRef, ProviderError> {
            let next = self.0.lock().unwrap().pop_front().unwrap_or(Ok(()));
            next.map(|()| ImageRef {
                id: format!("{kind}-img"),
                kind,
                byte_len: 4096,
                width: 1280,
                height: 720,
            })
        }
    }

    /// Matcher answering from a script; an empty script hangs forever.
    struct ScriptedMatcher {
        answers: Mutex<VecDeque<MatcherResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedMatcher {
        fn new(answers: Vec<(MatchOutcome, f64)>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(
                    answers
                        .into_iter()
                        .map(|(outcome, confidence_score)| MatcherResponse {
                            outcome,
                            confidence_score,
                        })
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BiometricMatcher for ScriptedMatcher {
        async fn compare(&self, _request: &MatchRequest) -> Result<MatcherResponse, MatcherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.answers.lock().unwrap().pop_front();
            match next {
                Some(response) => Ok(response),
                None => std::future::pending().await,
            }
        }
    }

    fn granted() -> PermissionLedger {
        let mut ledger = PermissionLedger::new();
        for capability in CapabilityKind::ALL {
            ledger.grant(capability);
        }
        ledger
    }

    fn driver(
        camera: Vec<Result<(), ProviderError>>,
        answers: Vec<(MatchOutcome, f64)>,
        config: VerificationConfig,
    ) -> SessionDriver {
        driver_with(camera, ScriptedMatcher::new(answers), config)
    }

    fn driver_with(
        camera: Vec<Result<(), ProviderError>>,
        matcher: Arc<ScriptedMatcher>,
        config: VerificationConfig,
    ) -> SessionDriver {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock(tokio::time::Instant::now()));
        let camera = Arc::new(ScriptedCamera(Mutex::new(camera.into())));
        let machine =
            VerificationStateMachine::new(RiderId::new("rider-1").unwrap(), config, clock.now());
        SessionDriver::new(
            machine,
            Arc::new(CaptureCoordinator::new(camera, CaptureLimits::default(), clock.clone())),
            Arc::new(MatchClient::new(matcher, MatchConfig::default(), clock.clone())),
            clock,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_approves() {
        let mut driver = driver(vec![], vec![(MatchOutcome::Matched, 0.95)], VerificationConfig::default());

        let state = driver.advance(&granted()).await;

        assert_eq!(state, SessionState::Approved);
        assert_eq!(driver.session().attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn low_confidence_retries_capture_then_approves() {
        let mut driver = driver(
            vec![],
            vec![(MatchOutcome::Matched, 0.60), (MatchOutcome::Matched, 0.91)],
            VerificationConfig::default(),
        );
        assert_eq!(driver.advance(&granted()).await, SessionState::Approved);
        assert_eq!(driver.session().attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_waits_for_resume() {
        let mut driver = driver(
            vec![Err(ProviderError::UserCancelled)],
            vec![(MatchOutcome::Matched, 0.95)],
            VerificationConfig::default(),
        );
        let ledger = granted();

        assert_eq!(driver.advance(&ledger).await, SessionState::PermissionsPending);
        assert_eq!(driver.session().attempt_count(), 0);
        // Advancing again does not re-trigger capture on its own.
        assert_eq!(driver.advance(&ledger).await, SessionState::PermissionsPending);

        assert_eq!(driver.resume(&ledger).await, SessionState::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn matcher_silence_ends_in_matcher_unavailable() {
        let matcher = ScriptedMatcher::new(vec![]);
        let mut driver = driver_with(vec![], Arc::clone(&matcher), VerificationConfig::default());
        let state = driver.advance(&granted()).await;
        assert_eq!(state, SessionState::Rejected(RejectionReason::MatcherUnavailable));
        assert_eq!(driver.session().matcher_retries(), 2);
        // One submission plus two resubmissions, each spending the client's
        // three attempts.
        assert_eq!(matcher.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cuts_a_hung_matcher_short() {
        let config = VerificationConfig {
            session_ttl: Duration::from_secs(15),
            ..VerificationConfig::default()
        };
        let mut driver = driver(vec![], vec![], config);
        let started = tokio::time::Instant::now();

        assert_eq!(driver.advance(&granted()).await, SessionState::Expired);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(14) && elapsed <= Duration::from_secs(16), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn check_deadline_expires_an_idle_session() {
        let config = VerificationConfig {
            session_ttl: Duration::from_secs(5),
            ..VerificationConfig::default()
        };
        let mut driver = driver(vec![], vec![], config);
        let mut ledger = granted();
        ledger.deny(CapabilityKind::Storage);
        assert_eq!(driver.advance(&ledger).await, SessionState::PermissionsPending);

        assert!(!driver.check_deadline());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(driver.check_deadline());
        assert_eq!(driver.state(), SessionState::Expired);
    }
}
