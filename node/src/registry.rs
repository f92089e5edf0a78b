//! Session registry: one actor per rider, addressed by rider id.
//!
//! Riders are independent: each has its own task and queue, so a rider
//! waiting on a slow camera never delays another. Commands for the same rider
//! are processed strictly in arrival order.

use rider_capture::CaptureCoordinator;
use rider_matcher::{BiometricMatcher, MatchClient};
use rider_telemetry::{ReporterStats, TelemetrySink};
use rider_types::{Clock, RiderId};
use rider_verification::{
    ReapplicationPolicy, SessionDriver, SessionState, VerificationConfig, VerificationError,
    VerificationStateMachine,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::actor::{ActorParts, SessionActor};
use crate::tracing_spans::session_span;
use crate::{
    EventBus, NodeError, PipelineConfig, PipelineMetrics, RiderDevices, SessionCommand,
    SessionView, ShutdownController,
};

/// How long [`SessionRegistry::shutdown`] waits for actors to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Services shared by every rider on a node.
#[derive(Clone)]
pub struct SharedServices {
    pub matcher: Arc<dyn BiometricMatcher>,
    pub sink: Arc<dyn TelemetrySink>,
    pub clock: Arc<dyn Clock>,
}

struct SessionEntry {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
    /// Taken by `shutdown`.
    task: Option<JoinHandle<()>>,
}

/// Starts, addresses, and stops per-rider session actors.
pub struct SessionRegistry {
    config: PipelineConfig,
    verification: VerificationConfig,
    policy: ReapplicationPolicy,
    services: SharedServices,
    match_client: Arc<MatchClient>,
    metrics: Arc<PipelineMetrics>,
    events: Arc<EventBus>,
    shutdown: ShutdownController,
    sessions: Mutex<HashMap<RiderId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(
        config: PipelineConfig,
        services: SharedServices,
        metrics: Arc<PipelineMetrics>,
        events: EventBus,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let match_client = Arc::new(MatchClient::new(
            Arc::clone(&services.matcher),
            config.match_config(),
            Arc::clone(&services.clock),
        ));
        Ok(Self {
            verification: config.verification_config(),
            policy: config.reapplication_policy(),
            config,
            services,
            match_client,
            metrics,
            events: Arc::new(events),
            shutdown: ShutdownController::new(),
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Start verifying `rider` with the given device handles.
    ///
    /// A rider with an earlier session may start again only if that session
    /// expired, or was rejected and the re-application policy allows it.
    pub async fn start_session(
        &self,
        rider: RiderId,
        devices: RiderDevices,
    ) -> Result<watch::Receiver<SessionView>, NodeError> {
        if self.shutdown.is_shutting_down() {
            return Err(NodeError::ShuttingDown);
        }
        let now = self.services.clock.now();
        let mut sessions = self.sessions.lock().await;

        if let Some(previous) = sessions.get(&rider) {
            let previous = previous.view.borrow().session.clone();
            self.policy.permits(&rider, &previous, now)?;
            tracing::info!(rider = %rider, previous = %previous.state(), "rider re-applying");
        }

        let machine = VerificationStateMachine::new(rider.clone(), self.verification.clone(), now);
        let capture = Arc::new(CaptureCoordinator::new(
            devices.camera,
            self.config.capture_limits(),
            Arc::clone(&self.services.clock),
        ));
        let driver = SessionDriver::new(
            machine,
            capture,
            Arc::clone(&self.match_client),
            Arc::clone(&self.services.clock),
        );
        let (actor, view) = SessionActor::new(ActorParts {
            rider: rider.clone(),
            driver,
            location: devices.location,
            sink: Arc::clone(&self.services.sink),
            telemetry: self.config.telemetry_config(),
            clock: Arc::clone(&self.services.clock),
            metrics: Arc::clone(&self.metrics),
            events: Arc::clone(&self.events),
        });

        let (commands, queue) = mpsc::channel(self.config.session_queue_depth);
        let task = tokio::spawn(
            actor
                .run(queue, self.shutdown.subscribe())
                .instrument(session_span(&rider)),
        );
        tracing::info!(rider = %rider, "session started");

        sessions.insert(
            rider,
            SessionEntry {
                commands,
                view: view.clone(),
                task: Some(task),
            },
        );
        Ok(view)
    }

    /// Queue a command for `rider`. Waits if the rider's queue is full.
    pub async fn dispatch(&self, rider: &RiderId, command: SessionCommand) -> Result<(), NodeError> {
        let sender = {
            let sessions = self.sessions.lock().await;
            let entry = sessions
                .get(rider)
                .ok_or_else(|| NodeError::UnknownRider(rider.clone()))?;
            entry.commands.clone()
        };
        sender
            .send(command)
            .await
            .map_err(|_| NodeError::SessionClosed(rider.clone()))
    }

    /// The latest view of `rider`'s session. Still available after the
    /// session ended.
    pub async fn snapshot(&self, rider: &RiderId) -> Result<SessionView, NodeError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(rider)
            .map(|entry| entry.view.borrow().clone())
            .ok_or_else(|| NodeError::UnknownRider(rider.clone()))
    }

    /// Receive every new view of `rider`'s session.
    pub async fn subscribe(&self, rider: &RiderId) -> Result<watch::Receiver<SessionView>, NodeError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(rider)
            .map(|entry| entry.view.clone())
            .ok_or_else(|| NodeError::UnknownRider(rider.clone()))
    }

    /// Take the rider off duty: the reporter stops and discards its buffer,
    /// the approval stands.
    pub async fn stop_reporting(&self, rider: &RiderId) -> Result<(), NodeError> {
        self.dispatch(rider, SessionCommand::GoOffDuty).await
    }

    pub async fn resume_reporting(&self, rider: &RiderId) -> Result<(), NodeError> {
        self.dispatch(rider, SessionCommand::GoOnDuty).await
    }

    /// Withdraw `rider`'s approval. Fails unless the session is approved.
    pub async fn revoke(&self, rider: &RiderId, note: impl Into<String>) -> Result<(), NodeError> {
        let state = self.snapshot(rider).await?.session.state();
        if state != SessionState::Approved {
            return Err(VerificationError::InvalidTransition {
                state,
                action: "revoke",
            }
            .into());
        }
        self.dispatch(rider, SessionCommand::Revoke { note: note.into() })
            .await
    }

    /// Counters of `rider`'s running reporter, if one is running.
    pub async fn reporter_stats(&self, rider: &RiderId) -> Result<Option<ReporterStats>, NodeError> {
        let (reply, answer) = oneshot::channel();
        self.dispatch(rider, SessionCommand::ReporterStats(reply)).await?;
        answer
            .await
            .map_err(|_| NodeError::SessionClosed(rider.clone()))
    }

    /// Riders with a session, in no particular order.
    pub async fn riders(&self) -> Vec<RiderId> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    /// Stop every actor and wait for them to finish.
    ///
    /// Reporters are stopped and their buffers discarded. Sessions keep their
    /// last state and stay queryable.
    pub async fn shutdown(&self) -> Result<(), NodeError> {
        self.shutdown.shutdown();
        let tasks: Vec<(RiderId, JoinHandle<()>)> = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .iter_mut()
                .filter_map(|(rider, entry)| entry.task.take().map(|task| (rider.clone(), task)))
                .collect()
        };

        let all = async {
            for (rider, task) in tasks {
                if let Err(err) = task.await {
                    tracing::error!(rider = %rider, error = %err, "session task failed");
                }
            }
        };
        tokio::time::timeout(SHUTDOWN_GRACE, all)
            .await
            .map_err(|_| NodeError::ShutdownTimeout)?;
        tracing::info!("all sessions stopped");
        Ok(())
    }
}
