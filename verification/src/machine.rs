//! The verification state machine.
//!
//! Pure and synchronous: every input arrives as a method call with the
//! current time, and every transition is recorded on the session and queued as
//! a [`VerificationEvent`] for the host to drain. I/O lives in
//! [`SessionDriver`](crate::SessionDriver).

use rider_capture::CaptureError;
use rider_permissions::PermissionLedger;
use rider_types::{EvidenceBundle, MatchOutcome, MatchResult, RiderId, Timestamp};

use crate::error::VerificationError;
use crate::state::{
    RejectionReason, SessionState, TransitionCause, TransitionRecord, VerificationSession,
};
use crate::VerificationConfig;

/// Events emitted by the state machine for the host to process.
#[derive(Clone, Debug, PartialEq)]
pub enum VerificationEvent {
    /// Any state change.
    Transitioned {
        rider: RiderId,
        from: SessionState,
        to: SessionState,
        at: Timestamp,
    },
    /// A match answer was recorded (before the transition it causes).
    MatchRecorded { rider: RiderId, result: MatchResult },
    Approved { rider: RiderId },
    Rejected {
        rider: RiderId,
        reason: RejectionReason,
    },
    Expired { rider: RiderId },
}

/// What the driver should do next to make progress.
#[derive(Clone, Debug, PartialEq)]
pub enum NextStep {
    /// Evaluate the permission ledger (fresh session).
    EvaluatePermissions,
    /// Nothing to do until a permission changes or the rider resumes.
    WaitForRider,
    Capture,
    Match(EvidenceBundle),
    /// Terminal.
    Done,
}

/// Drives one rider's [`VerificationSession`] through its lifecycle.
pub struct VerificationStateMachine {
    session: VerificationSession,
    config: VerificationConfig,
    pending_events: Vec<VerificationEvent>,
}

impl VerificationStateMachine {
    /// Create a session in `Created`, expiring `session_ttl` after `now`.
    pub fn new(rider_id: RiderId, config: VerificationConfig, now: Timestamp) -> Self {
        let session = VerificationSession {
            rider_id,
            state: SessionState::Created,
            evidence_bundle: None,
            match_result: None,
            attempt_count: 0,
            matcher_retries: 0,
            created_at: now,
            last_transition_at: now,
            expires_at: now.plus(config.session_ttl),
            history: vec![TransitionRecord {
                from: SessionState::Created,
                to: SessionState::Created,
                at: now,
                cause: TransitionCause::SessionCreated,
            }],
        };
        Self {
            session,
            config,
            pending_events: Vec::new(),
        }
    }

    pub fn session(&self) -> &VerificationSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    pub fn next_step(&self) -> NextStep {
        match self.session.state {
            SessionState::Created => NextStep::EvaluatePermissions,
            SessionState::PermissionsPending => NextStep::WaitForRider,
            SessionState::CapturingEvidence => NextStep::Capture,
            SessionState::AwaitingMatch => match &self.session.evidence_bundle {
                Some(bundle) => NextStep::Match(bundle.clone()),
                // Unreachable through the public API; capture again rather than stall.
                None => NextStep::Capture,
            },
            _ => NextStep::Done,
        }
    }

    /// Re-check the ledger. Moves `Created`/`PermissionsPending` to
    /// `CapturingEvidence` once every required capability is granted,
    /// otherwise parks in `PermissionsPending`. No effect in later states.
    pub fn evaluate_permissions(
        &mut self,
        ledger: &PermissionLedger,
        now: Timestamp,
    ) -> Result<SessionState, VerificationError> {
        if self.expire_if_due(now) {
            return Ok(self.session.state);
        }
        match self.session.state {
            SessionState::Created | SessionState::PermissionsPending => {
                let next = if ledger.all_granted(&self.config.required_capabilities) {
                    SessionState::CapturingEvidence
                } else {
                    tracing::debug!(
                        rider = %self.session.rider_id,
                        missing = ?ledger.missing(&self.config.required_capabilities),
                        "waiting on capabilities"
                    );
                    SessionState::PermissionsPending
                };
                if next != self.session.state {
                    self.transition(next, now, TransitionCause::PermissionsEvaluated);
                }
                Ok(self.session.state)
            }
            state if state.is_terminal() => Err(VerificationError::InvalidTransition {
                state,
                action: "evaluate permissions",
            }),
            state => Ok(state),
        }
    }

    /// Record a failed capture.
    ///
    /// Cancel and permission failures return to `PermissionsPending` for free.
    /// Hardware and quality failures consume an attempt.
    pub fn record_capture_failure(
        &mut self,
        error: &CaptureError,
        now: Timestamp,
    ) -> Result<SessionState, VerificationError> {
        if self.expire_if_due(now) {
            return Ok(self.session.state);
        }
        self.require(SessionState::CapturingEvidence, "record a capture failure")?;

        let cause = TransitionCause::CaptureFailed(error.to_string());
        if !error.costs_attempt() {
            self.transition(SessionState::PermissionsPending, now, cause);
        } else if self.consume_attempt() {
            tracing::warn!(
                rider = %self.session.rider_id,
                attempt = self.session.attempt_count,
                error = %error,
                "capture failed, retrying"
            );
            self.transition(SessionState::CapturingEvidence, now, cause);
        } else {
            self.reject(RejectionReason::EvidenceUnobtainable, now, cause);
        }
        Ok(self.session.state)
    }

    /// Record a validated evidence bundle and move to `AwaitingMatch`.
    pub fn record_evidence(
        &mut self,
        bundle: EvidenceBundle,
        now: Timestamp,
    ) -> Result<SessionState, VerificationError> {
        if self.expire_if_due(now) {
            return Ok(self.session.state);
        }
        self.require(SessionState::CapturingEvidence, "record evidence")?;
        self.session.evidence_bundle = Some(bundle);
        self.session.matcher_retries = 0;
        self.transition(SessionState::AwaitingMatch, now, TransitionCause::EvidenceCaptured);
        Ok(self.session.state)
    }

    /// Record the matcher's answer for the current bundle.
    pub fn record_match(
        &mut self,
        result: MatchResult,
        now: Timestamp,
    ) -> Result<SessionState, VerificationError> {
        if self.expire_if_due(now) {
            return Ok(self.session.state);
        }
        self.require(SessionState::AwaitingMatch, "record a match result")?;

        // A `matched` below our own threshold is a non-match, whatever the client said.
        let outcome = match result.outcome() {
            MatchOutcome::Matched if !result.qualifies(self.config.approval_threshold) => {
                MatchOutcome::NotMatched
            }
            other => other,
        };
        let result = MatchResult::new(outcome, result.confidence_score(), result.matched_at());
        self.session.match_result = Some(result);
        self.pending_events.push(VerificationEvent::MatchRecorded {
            rider: self.session.rider_id.clone(),
            result,
        });
        let cause = TransitionCause::MatchAnswered(outcome);

        match outcome {
            MatchOutcome::Matched => {
                self.transition(SessionState::Approved, now, cause);
                self.pending_events.push(VerificationEvent::Approved {
                    rider: self.session.rider_id.clone(),
                });
            }
            MatchOutcome::NotMatched => {
                if self.consume_attempt() {
                    self.session.evidence_bundle = None;
                    self.transition(SessionState::CapturingEvidence, now, cause);
                } else {
                    self.reject(RejectionReason::MatchFailed, now, cause);
                }
            }
            MatchOutcome::SpoofSuspected => {
                self.reject(RejectionReason::SpoofDetected, now, cause);
            }
            MatchOutcome::MatcherUnavailable => {
                if self.session.matcher_retries < self.config.matcher_unavailable_retries {
                    self.session.matcher_retries += 1;
                    tracing::warn!(
                        rider = %self.session.rider_id,
                        retry = self.session.matcher_retries,
                        "matcher unavailable, resubmitting the same bundle"
                    );
                    self.transition(SessionState::AwaitingMatch, now, cause);
                } else {
                    self.reject(RejectionReason::MatcherUnavailable, now, cause);
                }
            }
        }
        Ok(self.session.state)
    }

    /// Withdraw an approval.
    pub fn revoke(&mut self, now: Timestamp) -> Result<SessionState, VerificationError> {
        self.require(SessionState::Approved, "revoke")?;
        self.reject(RejectionReason::Revoked, now, TransitionCause::Revoked);
        Ok(self.session.state)
    }

    /// Force `Expired` if the deadline has been reached. Returns true if the
    /// session is (now) expired.
    pub fn expire_if_due(&mut self, now: Timestamp) -> bool {
        if self.session.state == SessionState::Expired {
            return true;
        }
        if self.session.state.is_terminal() || !self.session.expires_at.has_passed(now) {
            return false;
        }
        self.expire(now);
        true
    }

    /// Force `Expired` regardless of the clock. No effect on terminal sessions.
    pub fn expire(&mut self, now: Timestamp) {
        if self.session.state.is_terminal() {
            return;
        }
        tracing::warn!(
            rider = %self.session.rider_id,
            state = %self.session.state,
            "session deadline reached"
        );
        self.transition(SessionState::Expired, now, TransitionCause::DeadlineReached);
        self.pending_events.push(VerificationEvent::Expired {
            rider: self.session.rider_id.clone(),
        });
    }

    /// Drain pending events for the host to process.
    pub fn drain_events(&mut self) -> Vec<VerificationEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn require(&self, expected: SessionState, action: &'static str) -> Result<(), VerificationError> {
        if self.session.state == expected {
            Ok(())
        } else {
            Err(VerificationError::InvalidTransition {
                state: self.session.state,
                action,
            })
        }
    }

    /// Spend one attempt. Returns false when the budget is exhausted.
    fn consume_attempt(&mut self) -> bool {
        self.session.attempt_count = (self.session.attempt_count + 1).min(self.config.max_attempts);
        self.session.attempt_count < self.config.max_attempts
    }

    fn reject(&mut self, reason: RejectionReason, now: Timestamp, cause: TransitionCause) {
        tracing::warn!(rider = %self.session.rider_id, %reason, "session rejected");
        self.transition(SessionState::Rejected(reason), now, cause);
        self.pending_events.push(VerificationEvent::Rejected {
            rider: self.session.rider_id.clone(),
            reason,
        });
    }

    fn transition(&mut self, to: SessionState, now: Timestamp, cause: TransitionCause) {
        let from = self.session.state;
        self.session.state = to;
        self.session.last_transition_at = now;
        self.session.history.push(TransitionRecord {
            from,
            to,
            at: now,
            cause,
        });
        if from != to {
            tracing::info!(rider = %self.session.rider_id, %from, %to, "session transition");
        }
        self.pending_events.push(VerificationEvent::Transitioned {
            rider: self.session.rider_id.clone(),
            from,
            to,
            at: now,
        });
    }
}
