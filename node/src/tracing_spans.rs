//! Pre-built [`tracing::Span`] constructors for the tasks a node spawns.
//!
//! Consistent span names and fields make it easy to follow one rider across
//! the verification and telemetry logs.

use rider_types::RiderId;
use tracing::{info_span, Span};

/// Span covering a rider's session actor for its whole life.
pub fn session_span(rider: &RiderId) -> Span {
    info_span!("session", rider = %rider)
}

/// Span covering one command handled by a session actor.
pub fn command_span(rider: &RiderId, command: &str) -> Span {
    info_span!("command", rider = %rider, command = %command)
}

/// Span covering a rider's location reporter.
pub fn telemetry_span(rider: &RiderId) -> Span {
    info_span!("telemetry", rider = %rider)
}
