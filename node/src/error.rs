use rider_types::RiderId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("verification error: {0}")]
    Verification(#[from] rider_verification::VerificationError),

    #[error("invalid input: {0}")]
    Types(#[from] rider_types::TypesError),

    #[error("config error: {0}")]
    Config(String),

    #[error("no session for rider {0}")]
    UnknownRider(RiderId),

    #[error("session task for rider {0} has stopped")]
    SessionClosed(RiderId),

    #[error("node is shutting down")]
    ShuttingDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,

    #[error("{0}")]
    Other(String),
}
