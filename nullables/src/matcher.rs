//! Nullable biometric matcher: scripted answers.

use async_trait::async_trait;
use rider_matcher::{BiometricMatcher, MatchRequest, MatcherError, MatcherResponse};
use rider_types::MatchOutcome;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::lock;

#[derive(Clone, Debug)]
pub enum MatcherStep {
    Respond(MatchOutcome, f64),
    Fail(MatcherError),
    /// Never answers; the client's timeout fires.
    Hang,
}

/// A matcher that replays a script, then repeats its fallback step.
#[derive(Debug)]
pub struct NullMatcher {
    script: Mutex<VecDeque<MatcherStep>>,
    fallback: MatcherStep,
    calls: AtomicU32,
}

impl NullMatcher {
    /// Always answers `outcome` with `confidence`.
    pub fn answering(outcome: MatchOutcome, confidence: f64) -> Self {
        Self::with_script([], MatcherStep::Respond(outcome, confidence))
    }

    /// Never answers.
    pub fn silent() -> Self {
        Self::with_script([], MatcherStep::Hang)
    }

    pub fn with_script(steps: impl IntoIterator<Item = MatcherStep>, fallback: MatcherStep) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            fallback,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiometricMatcher for NullMatcher {
    async fn compare(&self, _request: &MatchRequest) -> Result<MatcherResponse, MatcherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            MatcherStep::Respond(outcome, confidence_score) => Ok(MatcherResponse {
                outcome,
                confidence_score,
            }),
            MatcherStep::Fail(err) => Err(err),
            MatcherStep::Hang => std::future::pending().await,
        }
    }
}
