//! Match client.
//!
//! Submits an evidence bundle to an external biometric matcher and turns
//! whatever comes back (an answer, an error, or silence) into a normalized
//! [`MatchResult`](rider_types::MatchResult). The matcher is third-party and
//! untrusted: malformed answers never approve.

pub mod client;
pub mod config;
pub mod error;
pub mod matcher;

pub use client::MatchClient;
pub use config::MatchConfig;
pub use error::MatcherError;
pub use matcher::{BiometricMatcher, MatchRequest, MatcherResponse};
