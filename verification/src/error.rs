use rider_types::{RiderId, Timestamp};
use thiserror::Error;

use crate::SessionState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    #[error("session for rider {0} is already in progress")]
    AlreadyInProgress(RiderId),

    #[error("rider {0} is already approved")]
    AlreadyApproved(RiderId),

    #[error("rider {0} may not re-apply after rejection")]
    ReapplicationDenied(RiderId),

    #[error("rider {rider} may re-apply after {until}")]
    CooldownActive { rider: RiderId, until: Timestamp },
}
