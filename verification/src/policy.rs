use rider_types::{RiderId, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{SessionState, VerificationError, VerificationSession};

/// Whether a rider whose previous session was rejected may start a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReapplicationPolicy {
    /// A rejected rider may start again at once.
    Allow,
    /// A rejection is final.
    Deny,
    /// A rejected rider may start again `secs` seconds after the rejection.
    Cooldown { secs: u64 },
}

impl Default for ReapplicationPolicy {
    fn default() -> Self {
        Self::Cooldown { secs: 24 * 60 * 60 }
    }
}

impl ReapplicationPolicy {
    /// Decide whether `rider` may replace `previous` with a new session at `now`.
    ///
    /// Running sessions report `AlreadyInProgress`, approved riders
    /// `AlreadyApproved`. Expired sessions may always restart since no
    /// decision was reached. A revoked approval counts as a rejection.
    pub fn permits(
        &self,
        rider: &RiderId,
        previous: &VerificationSession,
        now: Timestamp,
    ) -> Result<(), VerificationError> {
        match previous.state() {
            SessionState::Approved => Err(VerificationError::AlreadyApproved(rider.clone())),
            SessionState::Expired => Ok(()),
            SessionState::Rejected(_) => match *self {
                Self::Allow => Ok(()),
                Self::Deny => Err(VerificationError::ReapplicationDenied(rider.clone())),
                Self::Cooldown { secs } => {
                    let until = previous.last_transition_at().plus(Duration::from_secs(secs));
                    if until.has_passed(now) {
                        Ok(())
                    } else {
                        Err(VerificationError::CooldownActive {
                            rider: rider.clone(),
                            until,
                        })
                    }
                }
            },
            _ => Err(VerificationError::AlreadyInProgress(rider.clone())),
        }
    }
}
