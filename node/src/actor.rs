//! One task per rider: serializes commands into that rider's session.
//!
//! The actor owns the rider's permission ledger, the session driver, and the
//! location reporter while one is running. Commands arrive on a bounded queue
//! and are handled one at a time; nothing else touches the session.
//!
//! Shutdown is raced against every step, so a capture or match call in
//! flight never holds the node past its grace period. The session keeps the
//! state it had when the step was abandoned.

use rider_capture::CaptureProvider;
use rider_permissions::{DeviceEvent, PermissionLedger};
use rider_telemetry::{
    LocationProvider, LocationReporter, ReporterHandle, ReporterStats, TelemetryConfig,
    TelemetrySink,
};
use rider_types::{CapabilityKind, Clock, GrantState, RiderId};
use rider_verification::{SessionDriver, SessionState, VerificationEvent, VerificationSession};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::Instrument;

use crate::tracing_spans::{command_span, telemetry_span};
use crate::{EventBus, PipelineEvent, PipelineMetrics};

/// The rider's own hardware: camera and location.
#[derive(Clone)]
pub struct RiderDevices {
    pub camera: Arc<dyn CaptureProvider>,
    pub location: Arc<dyn LocationProvider>,
}

/// Commands accepted by a session actor.
#[derive(Debug)]
pub enum SessionCommand {
    /// A capability was granted or denied on the device.
    Device(DeviceEvent),
    /// The rider asks to continue after cancelling a capture.
    Resume,
    /// Withdraw an approval.
    Revoke { note: String },
    /// Stop location reporting without leaving `Approved`.
    GoOffDuty,
    GoOnDuty,
    /// Read the running reporter's counters.
    ReporterStats(oneshot::Sender<Option<ReporterStats>>),
}

impl SessionCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Device(_) => "device",
            Self::Resume => "resume",
            Self::Revoke { .. } => "revoke",
            Self::GoOffDuty => "go_off_duty",
            Self::GoOnDuty => "go_on_duty",
            Self::ReporterStats(_) => "reporter_stats",
        }
    }
}

/// What callers see of a rider's session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionView {
    pub session: VerificationSession,
    /// Grant state of every device capability.
    pub permissions: BTreeMap<CapabilityKind, GrantState>,
    pub on_duty: bool,
    /// Whether a location reporter is running.
    pub reporting: bool,
}

pub(crate) struct SessionActor {
    rider: RiderId,
    ledger: PermissionLedger,
    driver: SessionDriver,
    location: Arc<dyn LocationProvider>,
    sink: Arc<dyn TelemetrySink>,
    telemetry: TelemetryConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<PipelineMetrics>,
    events: Arc<EventBus>,
    reporter: Option<ReporterHandle>,
    /// First sequence number for the next reporter. Carried across reporter
    /// restarts so the rider's fixes stay strictly increasing.
    next_sequence: u64,
    on_duty: bool,
    view: watch::Sender<SessionView>,
    /// Whether this session still counts toward `rider_active_sessions`
    /// (not yet terminal).
    active: bool,
}

pub(crate) struct ActorParts {
    pub rider: RiderId,
    pub driver: SessionDriver,
    pub location: Arc<dyn LocationProvider>,
    pub sink: Arc<dyn TelemetrySink>,
    pub telemetry: TelemetryConfig,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<PipelineMetrics>,
    pub events: Arc<EventBus>,
}

impl SessionActor {
    pub(crate) fn new(parts: ActorParts) -> (Self, watch::Receiver<SessionView>) {
        let ledger = PermissionLedger::new();
        let (view, view_rx) = watch::channel(SessionView {
            session: parts.driver.session().clone(),
            permissions: ledger.snapshot(),
            on_duty: true,
            reporting: false,
        });
        let actor = Self {
            rider: parts.rider,
            ledger,
            driver: parts.driver,
            location: parts.location,
            sink: parts.sink,
            telemetry: parts.telemetry,
            clock: parts.clock,
            metrics: parts.metrics,
            events: parts.events,
            reporter: None,
            next_sequence: 1,
            on_duty: true,
            view,
            active: true,
        };
        (actor, view_rx)
    }

    /// Process commands until the session can no longer change, the queue
    /// closes, or the node shuts down.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        self.metrics.sessions_started.inc();
        self.metrics.active_sessions.inc();
        self.events.emit(&PipelineEvent::SessionStarted {
            rider: self.rider.clone(),
        });
        let mut stopping = tokio::select! {
            biased;
            _ = shutdown.recv() => true,
            _ = self.driver.advance(&self.ledger) => false,
        };
        if !stopping {
            self.settle().await;
        }

        while !stopping && !self.finished() {
            let remaining = self
                .driver
                .session()
                .expires_at()
                .remaining_from(self.clock.now());
            let waiting = !self.driver.session().is_terminal();

            tokio::select! {
                biased;
                _ = shutdown.recv() => stopping = true,
                command = commands.recv() => match command {
                    Some(command) => {
                        let span = command_span(&self.rider, command.name());
                        tokio::select! {
                            biased;
                            _ = shutdown.recv() => stopping = true,
                            _ = self.handle(command).instrument(span) => {}
                        }
                    }
                    None => break,
                },
                _ = tokio::time::sleep(remaining), if waiting => {
                    self.driver.check_deadline();
                }
            }
            if !stopping {
                self.settle().await;
            }
        }

        if stopping {
            tracing::info!(rider = %self.rider, state = %self.driver.state(), "session actor shutting down");
        }
        self.stop_reporter().await;
        self.deactivate();
        self.publish();
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Device(event) => {
                let Some(change) = self.ledger.apply(event) else {
                    return;
                };
                tracing::info!(
                    rider = %self.rider,
                    capability = change.capability.as_str(),
                    previous = ?change.previous,
                    current = ?change.current,
                    "capability changed"
                );
                self.events.emit(&PipelineEvent::Permission {
                    rider: self.rider.clone(),
                    change,
                });
                if matches!(
                    self.driver.state(),
                    SessionState::Created | SessionState::PermissionsPending
                ) {
                    self.driver.resume(&self.ledger).await;
                }
            }
            SessionCommand::Resume => {
                self.driver.resume(&self.ledger).await;
            }
            SessionCommand::Revoke { note } => match self.driver.revoke() {
                Ok(_) => tracing::warn!(rider = %self.rider, %note, "approval revoked"),
                Err(err) => tracing::warn!(rider = %self.rider, error = %err, "revoke ignored"),
            },
            SessionCommand::GoOffDuty => self.on_duty = false,
            SessionCommand::GoOnDuty => self.on_duty = true,
            SessionCommand::ReporterStats(reply) => {
                let stats = match &self.reporter {
                    Some(reporter) => Some(reporter.stats().await),
                    None => None,
                };
                let _ = reply.send(stats);
            }
        }
    }

    /// Apply the consequences of whatever just happened: metrics, events,
    /// reporter gating, and a fresh view.
    async fn settle(&mut self) {
        for event in self.driver.drain_events() {
            match &event {
                VerificationEvent::MatchRecorded { .. } => self.metrics.match_attempts.inc(),
                VerificationEvent::Approved { .. } => self.metrics.sessions_approved.inc(),
                VerificationEvent::Rejected { reason, .. } => self.metrics.record_rejection(*reason),
                VerificationEvent::Expired { .. } => self.metrics.sessions_expired.inc(),
                VerificationEvent::Transitioned { .. } => {}
            }
            self.events.emit(&PipelineEvent::Verification(event));
        }

        let state = self.driver.state();
        if state.is_terminal() {
            self.deactivate();
        }

        let should_report = state == SessionState::Approved
            && self.on_duty
            && self.ledger.is_granted(CapabilityKind::Location);
        match (should_report, self.reporter.is_some()) {
            (true, false) => self.start_reporter(),
            (false, true) => self.stop_reporter().await,
            _ => {}
        }
        self.publish();
    }

    fn start_reporter(&mut self) {
        let handle = {
            let _span = telemetry_span(&self.rider).entered();
            LocationReporter::new(
                self.rider.clone(),
                Arc::clone(&self.location),
                Arc::clone(&self.sink),
                self.telemetry.clone(),
                Arc::clone(&self.clock),
                Arc::clone(&self.metrics.telemetry),
            )
            .starting_at(self.next_sequence)
            .spawn()
        };
        self.reporter = Some(handle);
        self.events.emit(&PipelineEvent::ReporterStarted {
            rider: self.rider.clone(),
        });
    }

    async fn stop_reporter(&mut self) {
        if let Some(handle) = self.reporter.take() {
            let stats = handle.stop().await;
            self.next_sequence = stats.next_sequence;
            self.events.emit(&PipelineEvent::ReporterStopped {
                rider: self.rider.clone(),
                stats,
            });
        }
    }

    /// Nothing more can happen once a session is rejected or expired.
    fn finished(&self) -> bool {
        matches!(
            self.driver.state(),
            SessionState::Rejected(_) | SessionState::Expired
        )
    }

    fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            self.metrics.active_sessions.dec();
        }
    }

    fn publish(&self) {
        let view = SessionView {
            session: self.driver.session().clone(),
            permissions: self.ledger.snapshot(),
            on_duty: self.on_duty,
            reporting: self.reporter.is_some(),
        };
        self.view.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
