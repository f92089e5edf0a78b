//! Location telemetry reporter.
//!
//! Runs only while a rider's session is approved. Samples the device location
//! on a fixed interval, drops inaccurate and duplicate samples, stamps each
//! kept fix with a per-rider sequence number, and delivers fixes to the
//! telemetry sink through a bounded buffer. When the sink is unreachable the
//! buffer evicts its oldest fixes and counts every one of them.

pub mod buffer;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod reporter;
pub mod sequence;
pub mod sink;

pub use buffer::OutboundBuffer;
pub use coalesce::FixCoalescer;
pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use metrics::TelemetryMetrics;
pub use pipeline::{FixPipeline, Ingested, ReporterStats};
pub use provider::LocationProvider;
pub use reporter::{LocationReporter, ReporterHandle};
pub use sequence::SequenceAllocator;
pub use sink::{DeliveryReceipt, TelemetrySink};
