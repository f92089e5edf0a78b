//! Prometheus metrics for location telemetry.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Counters shared by every reporter on a node.
pub struct TelemetryMetrics {
    /// Samples read from location providers.
    pub fixes_sampled: IntCounter,
    /// Samples discarded as invalid or too inaccurate.
    pub fixes_discarded: IntCounter,
    /// Samples dropped as duplicates of the previous fix.
    pub fixes_coalesced: IntCounter,
    pub fixes_delivered: IntCounter,
    /// Undelivered fixes evicted from a full outbound buffer.
    pub fixes_dropped: IntCounter,
    /// Failed sink calls (errors, timeouts, missing acknowledgements).
    pub delivery_failures: IntCounter,
    pub active_reporters: IntGauge,
}

impl TelemetryMetrics {
    /// Create the metrics and register them with `registry`.
    pub fn register(registry: &Registry) -> Self {
        let counter = |name: &str, help: &str| {
            register_int_counter_with_registry!(Opts::new(name, help), registry)
                .expect("failed to register telemetry counter")
        };

        let fixes_sampled = counter("rider_fixes_sampled_total", "Location samples read from providers");
        let fixes_discarded = counter(
            "rider_fixes_discarded_total",
            "Location samples discarded as invalid or inaccurate",
        );
        let fixes_coalesced = counter(
            "rider_fixes_coalesced_total",
            "Location samples dropped as duplicates of the previous fix",
        );
        let fixes_delivered = counter("rider_fixes_delivered_total", "Fixes acknowledged by the sink");
        let fixes_dropped = counter(
            "rider_fixes_dropped_total",
            "Undelivered fixes evicted from a full outbound buffer",
        );
        let delivery_failures = counter(
            "rider_delivery_failures_total",
            "Failed telemetry sink calls",
        );
        let active_reporters = register_int_gauge_with_registry!(
            Opts::new("rider_active_reporters", "Location reporters currently running"),
            registry
        )
        .expect("failed to register active_reporters gauge");

        Self {
            fixes_sampled,
            fixes_discarded,
            fixes_coalesced,
            fixes_delivered,
            fixes_dropped,
            delivery_failures,
            active_reporters,
        }
    }

    /// Metrics registered with a private registry nobody scrapes.
    pub fn unregistered() -> Self {
        Self::register(&Registry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_metric() {
        let registry = Registry::new();
        let metrics = TelemetryMetrics::register(&registry);
        metrics.fixes_dropped.inc_by(800);
        metrics.active_reporters.inc();

        let families = registry.gather();
        assert_eq!(families.len(), 7);
        let dropped = families
            .iter()
            .find(|f| f.get_name() == "rider_fixes_dropped_total")
            .unwrap();
        assert_eq!(dropped.get_metric()[0].get_counter().get_value() as u64, 800);
    }
}
