//! Rider pipeline daemon.
//!
//! Device, matcher, and telemetry backends are integration points the host
//! application supplies. Until one is wired in, `simulate` drives the whole
//! pipeline against the in-memory nullables so a configuration can be tried
//! end to end.

use anyhow::Context;
use clap::Parser;
use rider_node::{
    EventBus, PipelineConfig, PipelineMetrics, RiderDevices, RuntimeClock, SessionCommand,
    SessionRegistry, SessionView, SharedServices,
};
use rider_nullables::{NullCamera, NullLocation, NullMatcher, NullSink};
use rider_permissions::DeviceEvent;
use rider_types::{CapabilityKind, Clock, MatchOutcome, RiderId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rider-daemon", about = "Rider verification and location telemetry pipeline")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base; CLI
    /// flags and env vars override them.
    #[arg(long, env = "RIDER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "RIDER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "RIDER_LOG_FORMAT")]
    log_format: Option<String>,

    /// Print Prometheus metrics when the run ends.
    #[arg(long, env = "RIDER_ENABLE_METRICS")]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run riders through verification and reporting with simulated devices.
    Simulate {
        /// Number of riders to verify.
        #[arg(long, default_value_t = 3)]
        riders: usize,

        /// How long approved riders report before the run stops.
        #[arg(long, default_value_t = 30)]
        duration_secs: u64,

        /// Confidence the simulated matcher answers with.
        #[arg(long, default_value_t = 0.95)]
        confidence: f64,

        /// Every n-th rider presents a spoof. 0 disables.
        #[arg(long, default_value_t = 0)]
        spoof_every: usize,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.enable_metrics |= cli.metrics;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string());
        }
        Command::Simulate {
            riders,
            duration_secs,
            confidence,
            spoof_every,
        } => {
            rider_node::init_logging(config.log_format()?, &config.log_level)?;
            if let Some(path) = &cli.config {
                tracing::info!(path = %path.display(), "loaded config");
            }
            simulate(config, riders, Duration::from_secs(duration_secs), confidence, spoof_every)
                .await?;
        }
    }
    Ok(())
}

async fn simulate(
    config: PipelineConfig,
    riders: usize,
    duration: Duration,
    confidence: f64,
    spoof_every: usize,
) -> anyhow::Result<()> {
    let enable_metrics = config.enable_metrics;
    let clock: Arc<dyn Clock> = Arc::new(RuntimeClock::new());
    let sink = Arc::new(NullSink::new());
    let honest = Arc::new(NullMatcher::answering(MatchOutcome::Matched, confidence));
    let spoofed = Arc::new(NullMatcher::answering(MatchOutcome::SpoofSuspected, 0.99));

    // Both nodes report into one set of counters, so either registry can print them.
    let metrics = Arc::new(PipelineMetrics::new());
    let services = SharedServices {
        matcher: honest,
        sink: sink.clone(),
        clock: Arc::clone(&clock),
    };
    let registry = SessionRegistry::new(
        config.clone(),
        services,
        Arc::clone(&metrics),
        EventBus::new(),
    )?;

    // Spoofing riders share a node whose matcher flags every bundle.
    let spoof_registry = if spoof_every > 0 {
        let services = SharedServices {
            matcher: spoofed,
            sink: sink.clone(),
            clock: Arc::clone(&clock),
        };
        Some(SessionRegistry::new(
            config,
            services,
            Arc::clone(&metrics),
            EventBus::new(),
        )?)
    } else {
        None
    };

    let mut started = Vec::with_capacity(riders);
    for index in 1..=riders {
        let rider = RiderId::new(format!("rider-{index}"))?;
        let registry = match &spoof_registry {
            Some(spoofing) if index % spoof_every == 0 => spoofing,
            _ => &registry,
        };
        let devices = RiderDevices {
            camera: Arc::new(NullCamera::new()),
            location: Arc::new(NullLocation::moving(Arc::clone(&clock), 25.0)),
        };
        registry.start_session(rider.clone(), devices).await?;
        for capability in CapabilityKind::ALL {
            registry
                .dispatch(&rider, SessionCommand::Device(DeviceEvent::grant(capability)))
                .await?;
        }
        started.push((rider, registry));
    }
    tracing::info!(riders, duration_secs = duration.as_secs(), "simulation running");

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = registry.shutdown_controller().wait_for_signal() => {
            tracing::info!("shutdown signal received, stopping early");
        }
    }

    let mut views: Vec<SessionView> = Vec::with_capacity(started.len());
    for (rider, registry) in &started {
        views.push(registry.snapshot(rider).await?);
    }
    registry.shutdown().await?;
    if let Some(spoofing) = &spoof_registry {
        spoofing.shutdown().await?;
    }

    let report = serde_json::json!({
        "sessions": views,
        "fixes_delivered": sink.sequence_numbers().len(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if enable_metrics {
        eprint!("{}", registry.metrics().encode_text());
    }
    tracing::info!("rider daemon exited cleanly");
    Ok(())
}
