use proptest::prelude::*;
use rider_capture::CaptureError;
use rider_permissions::PermissionLedger;
use rider_types::{
    CapabilityKind, EvidenceBundle, ImageKind, ImageRef, MatchOutcome, MatchResult, RiderId,
    Timestamp,
};
use rider_verification::{SessionState, VerificationConfig, VerificationStateMachine};

#[derive(Clone, Debug)]
enum Input {
    Grant(CapabilityKind),
    Deny(CapabilityKind),
    CaptureFailed(CaptureError),
    Evidence,
    Match(MatchOutcome, f64),
    Tick(u64),
}

fn capability() -> impl Strategy<Value = CapabilityKind> {
    prop::sample::select(CapabilityKind::ALL.to_vec())
}

fn outcome() -> impl Strategy<Value = MatchOutcome> {
    prop::sample::select(vec![
        MatchOutcome::Matched,
        MatchOutcome::NotMatched,
        MatchOutcome::SpoofSuspected,
        MatchOutcome::MatcherUnavailable,
    ])
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        capability().prop_map(Input::Grant),
        capability().prop_map(Input::Deny),
        Just(Input::CaptureFailed(CaptureError::UserCancelled)),
        Just(Input::CaptureFailed(CaptureError::HardwareUnavailable("busy".into()))),
        Just(Input::CaptureFailed(CaptureError::InvalidEvidence("blurry".into()))),
        Just(Input::Evidence),
        (outcome(), 0.0f64..=1.0).prop_map(|(o, c)| Input::Match(o, c)),
        (0u64..600).prop_map(Input::Tick),
    ]
}

fn bundle(at: Timestamp) -> EvidenceBundle {
    let image = |kind: ImageKind| ImageRef {
        id: format!("{kind}"),
        kind,
        byte_len: 1,
        width: 640,
        height: 640,
    };
    EvidenceBundle::new(image(ImageKind::Document), image(ImageKind::Face), at)
}

/// Feed inputs, ignoring ones the current state does not accept.
fn run(inputs: &[Input], config: VerificationConfig) -> (VerificationStateMachine, bool) {
    let mut ledger = PermissionLedger::new();
    let mut now = Timestamp::EPOCH;
    let mut sm = VerificationStateMachine::new(RiderId::new("prop").unwrap(), config.clone(), now);
    let mut qualifying_match_seen = false;

    for input in inputs {
        now = now.plus(std::time::Duration::from_secs(1));
        let _ = match input {
            Input::Grant(c) => {
                ledger.grant(*c);
                sm.evaluate_permissions(&ledger, now)
            }
            Input::Deny(c) => {
                ledger.deny(*c);
                sm.evaluate_permissions(&ledger, now)
            }
            Input::CaptureFailed(err) => sm.record_capture_failure(err, now),
            Input::Evidence => sm.record_evidence(bundle(now), now),
            Input::Match(outcome, confidence) => {
                let accepted = sm.state() == SessionState::AwaitingMatch;
                if accepted
                    && *outcome == MatchOutcome::Matched
                    && *confidence >= config.approval_threshold
                    && !sm.session().expires_at().has_passed(now)
                {
                    qualifying_match_seen = true;
                }
                sm.record_match(MatchResult::new(*outcome, *confidence, now), now)
            }
            Input::Tick(secs) => {
                now = now.plus(std::time::Duration::from_secs(*secs));
                sm.expire_if_due(now);
                Ok(sm.state())
            }
        };
    }
    (sm, qualifying_match_seen)
}

proptest! {
    #[test]
    fn attempt_count_never_exceeds_max(
        inputs in prop::collection::vec(input(), 0..80),
        max_attempts in 1u32..5,
    ) {
        let config = VerificationConfig { max_attempts, ..VerificationConfig::default() };
        let (sm, _) = run(&inputs, config);
        prop_assert!(sm.session().attempt_count() <= max_attempts);
        // Nothing ever leaves a terminal state.
        for record in sm.session().history() {
            prop_assert!(!record.from.is_terminal());
        }
    }

    #[test]
    fn approval_requires_a_qualifying_match(inputs in prop::collection::vec(input(), 0..80)) {
        let (sm, qualifying) = run(&inputs, VerificationConfig::default());
        if sm.state() == SessionState::Approved {
            prop_assert!(qualifying);
            let result = sm.session().match_result().unwrap();
            prop_assert_eq!(result.outcome(), MatchOutcome::Matched);
            prop_assert!(result.confidence_score() >= 0.85);
        }
    }

    #[test]
    fn spoof_rejects_straight_from_awaiting_match(inputs in prop::collection::vec(input(), 0..80)) {
        let (sm, _) = run(&inputs, VerificationConfig::default());
        if let SessionState::Rejected(rider_verification::RejectionReason::SpoofDetected) = sm.state() {
            let last = sm.session().history().last().map(|r| r.from);
            prop_assert_eq!(last, Some(SessionState::AwaitingMatch));
        }
    }
}
