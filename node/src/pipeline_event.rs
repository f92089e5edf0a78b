//! Events emitted by session actors for observers.

use rider_permissions::PermissionChange;
use rider_telemetry::ReporterStats;
use rider_types::RiderId;
use rider_verification::VerificationEvent;

/// Node-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    /// A verification session was created (first application or re-application).
    SessionStarted { rider: RiderId },
    /// The state machine emitted an event.
    Verification(VerificationEvent),
    /// A device capability changed state.
    Permission {
        rider: RiderId,
        change: PermissionChange,
    },
    ReporterStarted { rider: RiderId },
    /// The reporter stopped and its buffer was discarded.
    ReporterStopped { rider: RiderId, stats: ReporterStats },
}

/// Synchronous fan-out event bus for pipeline events.
///
/// Listeners are invoked inline on the emitting actor's task; keep handlers
/// fast to avoid stalling that rider's session.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&PipelineEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&PipelineEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &PipelineEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn rider() -> RiderId {
        RiderId::new("rider-1").unwrap()
    }

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&PipelineEvent::SessionStarted { rider: rider() });
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn listener_sees_the_variant() {
        let approvals = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::default();

        let a = Arc::clone(&approvals);
        bus.subscribe(Box::new(move |event| {
            if let PipelineEvent::Verification(VerificationEvent::Approved { .. }) = event {
                a.fetch_add(1, Ordering::SeqCst);
            }
        }));

        bus.emit(&PipelineEvent::ReporterStarted { rider: rider() });
        bus.emit(&PipelineEvent::Verification(VerificationEvent::Approved { rider: rider() }));
        assert_eq!(approvals.load(Ordering::SeqCst), 1);
    }
}
