//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tidepool_config::SocketEndpoint;

use crate::diagnostics::{Diagnostic, DiagnosticStage};
use crate::health::HealthReporter;
use crate::supervisor::{ExitStatus, ShutdownStepError, StartupError, TerminationSignal};

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    StartupBegun,
    EngineReady,
    ListenerReady(SocketEndpoint),
    Running(SocketEndpoint),
    StartupFailed(String),
    SignalReceived(TerminationSignal),
    SignalSourceClosed,
    SignalIgnored(TerminationSignal),
    ShutdownStepFailed(DiagnosticStage),
    DiagnosticRecorded(DiagnosticStage),
    Stopped(ExitStatus),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
    changed: Condvar,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
        self.changed.notify_all();
    }

    /// Blocks until the supervisor reports `Running`, returning its endpoint.
    pub fn wait_for_running(&self, timeout: Duration) -> Option<SocketEndpoint> {
        let events = self.events.lock().expect("health reporter mutex poisoned");
        let (events, _) = self
            .changed
            .wait_timeout_while(events, timeout, |events| {
                !events.iter().any(|event| {
                    matches!(
                        event,
                        HealthEvent::Running(_) | HealthEvent::Stopped(_)
                    )
                })
            })
            .expect("health reporter mutex poisoned");
        events.iter().find_map(|event| match event {
            HealthEvent::Running(endpoint) => Some(endpoint.clone()),
            _ => None,
        })
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn startup_begun(&self) {
        self.record(HealthEvent::StartupBegun);
    }

    fn engine_ready(&self) {
        self.record(HealthEvent::EngineReady);
    }

    fn listener_ready(&self, endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerReady(endpoint.clone()));
    }

    fn running(&self, endpoint: &SocketEndpoint) {
        self.record(HealthEvent::Running(endpoint.clone()));
    }

    fn startup_failed(&self, error: &StartupError) {
        self.record(HealthEvent::StartupFailed(error.to_string()));
    }

    fn signal_received(&self, signal: TerminationSignal) {
        self.record(HealthEvent::SignalReceived(signal));
    }

    fn signal_source_closed(&self) {
        self.record(HealthEvent::SignalSourceClosed);
    }

    fn signal_ignored(&self, signal: TerminationSignal) {
        self.record(HealthEvent::SignalIgnored(signal));
    }

    fn shutdown_step_failed(&self, error: &ShutdownStepError) {
        self.record(HealthEvent::ShutdownStepFailed(error.stage()));
    }

    fn diagnostic_recorded(&self, diagnostic: &Diagnostic) {
        self.record(HealthEvent::DiagnosticRecorded(diagnostic.stage));
    }

    fn stopped(&self, status: ExitStatus) {
        self.record(HealthEvent::Stopped(status));
    }
}
