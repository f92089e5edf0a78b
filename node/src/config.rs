//! Pipeline configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use rider_capture::CaptureLimits;
use rider_matcher::MatchConfig;
use rider_permissions::CapabilitySet;
use rider_telemetry::TelemetryConfig;
use rider_types::RetryPolicy;
use rider_verification::{ReapplicationPolicy, VerificationConfig};

use crate::{LogFormat, NodeError};

/// Configuration for a pipeline node.
///
/// Can be loaded from a TOML file via [`PipelineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Commands buffered per rider before senders wait.
    #[serde(default = "default_session_queue_depth")]
    pub session_queue_depth: usize,

    /// Whether to expose Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub verification: VerificationSection,

    #[serde(default)]
    pub capture: CaptureSection,

    #[serde(default)]
    pub matcher: MatcherSection,

    #[serde(default)]
    pub telemetry: TelemetrySection,
}

/// Whether rejected riders may apply again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReapplicationMode {
    Allow,
    Deny,
    Cooldown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationSection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_matcher_unavailable_retries")]
    pub matcher_unavailable_retries: u32,
    #[serde(default = "CapabilitySet::all")]
    pub required_capabilities: CapabilitySet,
    #[serde(default = "default_reapplication")]
    pub reapplication: ReapplicationMode,
    /// Only used with `reapplication = "cooldown"`.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureSection {
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
    #[serde(default = "default_min_dimension")]
    pub min_width: u32,
    #[serde(default = "default_min_dimension")]
    pub min_height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatcherSection {
    #[serde(default = "default_matcher_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySection {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    #[serde(default = "default_sample_timeout_ms")]
    pub sample_timeout_ms: u64,
    #[serde(default = "default_min_distance_meters")]
    pub min_distance_meters: f64,
    #[serde(default = "default_max_silence_secs")]
    pub max_silence_secs: u64,
    #[serde(default = "default_max_accuracy_meters")]
    pub max_accuracy_meters: f64,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub delivery_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_queue_depth() -> usize {
    64
}

fn default_max_attempts() -> u32 {
    3
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_matcher_unavailable_retries() -> u32 {
    2
}

fn default_reapplication() -> ReapplicationMode {
    ReapplicationMode::Cooldown
}

fn default_cooldown_secs() -> u64 {
    24 * 60 * 60
}

fn default_capture_timeout_ms() -> u64 {
    60_000
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_dimension() -> u32 {
    4096
}

fn default_min_dimension() -> u32 {
    320
}

fn default_matcher_timeout_ms() -> u64 {
    10_000
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_jitter() -> f64 {
    0.2
}

fn default_confidence_threshold() -> f64 {
    0.85
}

fn default_sample_interval_ms() -> u64 {
    5_000
}

fn default_sample_timeout_ms() -> u64 {
    2_000
}

fn default_min_distance_meters() -> f64 {
    10.0
}

fn default_max_silence_secs() -> u64 {
    60
}

fn default_max_accuracy_meters() -> f64 {
    100.0
}

fn default_buffer_capacity() -> usize {
    rider_telemetry::buffer::DEFAULT_BUFFER_CAPACITY
}

fn default_batch_size() -> usize {
    50
}

fn default_delivery_timeout_ms() -> u64 {
    5_000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("PipelineConfig is always serializable to TOML")
    }

    /// Reject values the components cannot work with.
    pub fn validate(&self) -> Result<(), NodeError> {
        let fail = |msg: String| Err(NodeError::Config(msg));

        self.log_format()?;
        if self.session_queue_depth == 0 {
            return fail("session_queue_depth must be at least 1".into());
        }
        if self.verification.max_attempts == 0 {
            return fail("verification.max_attempts must be at least 1".into());
        }
        if self.verification.session_ttl_secs == 0 {
            return fail("verification.session_ttl_secs must be positive".into());
        }
        if self.capture.timeout_ms == 0 || self.matcher.timeout_ms == 0 {
            return fail("capture and matcher timeouts must be positive".into());
        }
        if self.capture.min_width > self.capture.max_width
            || self.capture.min_height > self.capture.max_height
        {
            return fail("capture minimum resolution exceeds the maximum".into());
        }
        if !(0.0..=1.0).contains(&self.matcher.confidence_threshold) {
            return fail(format!(
                "matcher.confidence_threshold {} is outside [0, 1]",
                self.matcher.confidence_threshold
            ));
        }
        for (section, jitter) in [("matcher", self.matcher.jitter), ("telemetry", self.telemetry.jitter)] {
            if !(0.0..1.0).contains(&jitter) {
                return fail(format!("{section}.jitter {jitter} is outside [0, 1)"));
            }
        }
        let t = &self.telemetry;
        if t.sample_interval_ms == 0 || t.sample_timeout_ms == 0 || t.delivery_timeout_ms == 0 {
            return fail("telemetry intervals and timeouts must be positive".into());
        }
        if t.buffer_capacity == 0 || t.batch_size == 0 {
            return fail("telemetry.buffer_capacity and batch_size must be at least 1".into());
        }
        if !(t.min_distance_meters >= 0.0 && t.max_accuracy_meters > 0.0) {
            return fail("telemetry.min_distance_meters must be >= 0 and max_accuracy_meters > 0".into());
        }
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        match self.log_format.as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(NodeError::Config(format!(
                "unknown log_format {other:?}, expected \"human\" or \"json\""
            ))),
        }
    }

    pub fn verification_config(&self) -> VerificationConfig {
        let v = &self.verification;
        VerificationConfig {
            max_attempts: v.max_attempts,
            session_ttl: Duration::from_secs(v.session_ttl_secs),
            matcher_unavailable_retries: v.matcher_unavailable_retries,
            required_capabilities: v.required_capabilities.clone(),
            approval_threshold: self.matcher.confidence_threshold,
        }
    }

    pub fn reapplication_policy(&self) -> ReapplicationPolicy {
        match self.verification.reapplication {
            ReapplicationMode::Allow => ReapplicationPolicy::Allow,
            ReapplicationMode::Deny => ReapplicationPolicy::Deny,
            ReapplicationMode::Cooldown => ReapplicationPolicy::Cooldown {
                secs: self.verification.cooldown_secs,
            },
        }
    }

    pub fn capture_limits(&self) -> CaptureLimits {
        let c = &self.capture;
        CaptureLimits {
            timeout: Duration::from_millis(c.timeout_ms),
            max_image_bytes: c.max_image_bytes,
            max_width: c.max_width,
            max_height: c.max_height,
            min_width: c.min_width,
            min_height: c.min_height,
        }
    }

    pub fn match_config(&self) -> MatchConfig {
        let m = &self.matcher;
        MatchConfig {
            timeout: Duration::from_millis(m.timeout_ms),
            retry: RetryPolicy {
                max_retries: m.max_retries,
                base: Duration::from_millis(m.backoff_base_ms),
                factor: m.backoff_factor,
                jitter: m.jitter,
            },
            confidence_threshold: m.confidence_threshold,
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        let t = &self.telemetry;
        TelemetryConfig {
            sample_interval: Duration::from_millis(t.sample_interval_ms),
            sample_timeout: Duration::from_millis(t.sample_timeout_ms),
            min_distance_meters: t.min_distance_meters,
            max_silence: Duration::from_secs(t.max_silence_secs),
            max_accuracy_meters: t.max_accuracy_meters,
            buffer_capacity: t.buffer_capacity,
            batch_size: t.batch_size,
            delivery_timeout: Duration::from_millis(t.delivery_timeout_ms),
            delivery_retry: RetryPolicy {
                max_retries: t.delivery_retries,
                base: Duration::from_millis(t.backoff_base_ms),
                factor: t.backoff_factor,
                jitter: t.jitter,
            },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            session_queue_depth: default_session_queue_depth(),
            enable_metrics: false,
            verification: VerificationSection::default(),
            capture: CaptureSection::default(),
            matcher: MatcherSection::default(),
            telemetry: TelemetrySection::default(),
        }
    }
}

impl Default for VerificationSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            session_ttl_secs: default_session_ttl_secs(),
            matcher_unavailable_retries: default_matcher_unavailable_retries(),
            required_capabilities: CapabilitySet::all(),
            reapplication: default_reapplication(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_capture_timeout_ms(),
            max_image_bytes: default_max_image_bytes(),
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            min_width: default_min_dimension(),
            min_height: default_min_dimension(),
        }
    }
}

impl Default for MatcherSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_matcher_timeout_ms(),
            max_retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_factor: default_backoff_factor(),
            jitter: default_jitter(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            sample_timeout_ms: default_sample_timeout_ms(),
            min_distance_meters: default_min_distance_meters(),
            max_silence_secs: default_max_silence_secs(),
            max_accuracy_meters: default_max_accuracy_meters(),
            buffer_capacity: default_buffer_capacity(),
            batch_size: default_batch_size(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            delivery_retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_factor: default_backoff_factor(),
            jitter: default_jitter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rider_types::CapabilityKind;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = PipelineConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = PipelineConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config, PipelineConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.match_config(), MatchConfig::default());
        assert_eq!(config.capture_limits(), CaptureLimits::default());
        assert_eq!(config.telemetry_config(), TelemetryConfig::default());
        assert_eq!(config.verification_config(), VerificationConfig::default());
        assert_eq!(config.reapplication_policy(), ReapplicationPolicy::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            log_format = "json"

            [verification]
            max_attempts = 5
            required_capabilities = ["camera", "location"]
            reapplication = "deny"

            [telemetry]
            buffer_capacity = 500
        "#;
        let config = PipelineConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
        assert_eq!(config.verification.max_attempts, 5);
        assert_eq!(config.reapplication_policy(), ReapplicationPolicy::Deny);
        let required = config.verification_config().required_capabilities;
        assert!(required.contains(CapabilityKind::Camera));
        assert!(!required.contains(CapabilityKind::Microphone));
        assert_eq!(config.telemetry_config().buffer_capacity, 500);
        assert_eq!(config.telemetry.batch_size, 50); // default
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.matcher.confidence_threshold = 1.5;
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));

        let mut config = PipelineConfig::default();
        config.telemetry.buffer_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.verification.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.log_format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_returns_io_error() {
        let result = PipelineConfig::from_toml_file("/nonexistent/rider.toml");
        assert!(matches!(result, Err(NodeError::Io(_))));
    }
}
