//! Prometheus metrics for a pipeline node.
//!
//! Covers session lifecycle and match activity here, and registers the
//! telemetry counters from [`TelemetryMetrics`] in the same [`Registry`], so
//! one scrape sees everything.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use rider_telemetry::TelemetryMetrics;
use rider_verification::RejectionReason;
use std::sync::Arc;

/// Central collection of all node-level Prometheus metrics.
pub struct PipelineMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Sessions created, including re-applications.
    pub sessions_started: IntCounter,
    pub sessions_approved: IntCounter,
    /// Rejected sessions, labelled by rejection reason.
    pub sessions_rejected: IntCounterVec,
    pub sessions_expired: IntCounter,
    /// Evidence bundles answered by the match client (one per recorded result).
    pub match_attempts: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Sessions not yet in a terminal state.
    pub active_sessions: IntGauge,

    /// Reporter counters, shared with every reporter on this node.
    pub telemetry: Arc<TelemetryMetrics>,
}

impl PipelineMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let sessions_started = register_int_counter_with_registry!(
            Opts::new("rider_sessions_started_total", "Verification sessions started"),
            registry
        )
        .expect("failed to register sessions_started counter");

        let sessions_approved = register_int_counter_with_registry!(
            Opts::new("rider_sessions_approved_total", "Verification sessions approved"),
            registry
        )
        .expect("failed to register sessions_approved counter");

        let sessions_rejected = register_int_counter_vec_with_registry!(
            Opts::new("rider_sessions_rejected_total", "Verification sessions rejected"),
            &["reason"],
            registry
        )
        .expect("failed to register sessions_rejected counter");

        let sessions_expired = register_int_counter_with_registry!(
            Opts::new(
                "rider_sessions_expired_total",
                "Verification sessions that hit their deadline"
            ),
            registry
        )
        .expect("failed to register sessions_expired counter");

        let match_attempts = register_int_counter_with_registry!(
            Opts::new("rider_match_attempts_total", "Match results recorded"),
            registry
        )
        .expect("failed to register match_attempts counter");

        let active_sessions = register_int_gauge_with_registry!(
            Opts::new("rider_active_sessions", "Verification sessions in progress"),
            registry
        )
        .expect("failed to register active_sessions gauge");

        let telemetry = Arc::new(TelemetryMetrics::register(&registry));

        Self {
            registry,
            sessions_started,
            sessions_approved,
            sessions_rejected,
            sessions_expired,
            match_attempts,
            active_sessions,
            telemetry,
        }
    }

    pub fn record_rejection(&self, reason: RejectionReason) {
        self.sessions_rejected
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        if let Err(err) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %err, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
