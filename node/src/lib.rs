//! Pipeline node: hosts rider sessions and their location reporters.
//!
//! The node is the coordinator that:
//! - Runs one actor per rider, serializing that rider's commands
//! - Drives each verification session through capture and match
//! - Starts location reporting on approval and stops it on revocation,
//!   expiry, going off duty, or a location deny
//! - Loads configuration, initialises logging, and exposes metrics

pub mod actor;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline_event;
pub mod registry;
pub mod shutdown;
pub mod tracing_spans;

pub use actor::{RiderDevices, SessionCommand, SessionView};
pub use clock::RuntimeClock;
pub use config::{PipelineConfig, ReapplicationMode};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::PipelineMetrics;
pub use pipeline_event::{EventBus, PipelineEvent};
pub use registry::{SessionRegistry, SharedServices};
pub use shutdown::ShutdownController;
