//! Rider verification state machine.
//!
//! One session per rider moves through
//! `Created → PermissionsPending → CapturingEvidence → AwaitingMatch` and ends
//! in `Approved`, `Rejected` or `Expired`:
//! 1. **Permissions**: every required capability must be granted before capture.
//! 2. **Evidence**: a document and a live face image are captured and validated.
//! 3. **Match**: the bundle goes to the biometric matcher; only a qualifying
//!    `matched` answer approves.
//!
//! The machine itself is synchronous and owns the session exclusively;
//! [`SessionDriver`] performs the I/O and bounds it by the session deadline.
//! Nothing here ever defaults to approval: a session that cannot confirm
//! identity is rejected or expires.

pub mod config;
pub mod driver;
pub mod error;
pub mod machine;
pub mod policy;
pub mod state;

pub use config::VerificationConfig;
pub use driver::SessionDriver;
pub use error::VerificationError;
pub use machine::{NextStep, VerificationEvent, VerificationStateMachine};
pub use policy::ReapplicationPolicy;
pub use state::{
    RejectionReason, SessionState, TransitionCause, TransitionRecord, VerificationSession,
};
