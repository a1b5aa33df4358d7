//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use tidepool_config::SocketEndpoint;

use crate::diagnostics::Diagnostic;
use crate::supervisor::{ExitStatus, ShutdownStepError, StartupError, TerminationSignal};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before the engine starts.
    fn startup_begun(&self);

    /// Invoked once the engine is open.
    fn engine_ready(&self);

    /// Invoked once the listener accepts connections.
    fn listener_ready(&self, endpoint: &SocketEndpoint);

    /// Invoked after signal handlers are installed and the supervisor waits.
    fn running(&self, endpoint: &SocketEndpoint);

    /// Invoked when a startup step fails.
    fn startup_failed(&self, error: &StartupError);

    /// Invoked when the signal that starts shutdown arrives.
    fn signal_received(&self, signal: TerminationSignal);

    /// Invoked when the signal channel closes without delivering a signal.
    fn signal_source_closed(&self);

    /// Invoked for signals that arrive while shutdown is already underway.
    fn signal_ignored(&self, signal: TerminationSignal);

    /// Invoked when a shutdown step fails; shutdown continues.
    fn shutdown_step_failed(&self, error: &ShutdownStepError);

    /// Invoked whenever a non-fatal problem is recorded.
    fn diagnostic_recorded(&self, diagnostic: &Diagnostic);

    /// Invoked once, as the supervisor returns.
    fn stopped(&self, status: ExitStatus);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn startup_begun(&self) {
        (**self).startup_begun();
    }

    fn engine_ready(&self) {
        (**self).engine_ready();
    }

    fn listener_ready(&self, endpoint: &SocketEndpoint) {
        (**self).listener_ready(endpoint);
    }

    fn running(&self, endpoint: &SocketEndpoint) {
        (**self).running(endpoint);
    }

    fn startup_failed(&self, error: &StartupError) {
        (**self).startup_failed(error);
    }

    fn signal_received(&self, signal: TerminationSignal) {
        (**self).signal_received(signal);
    }

    fn signal_source_closed(&self) {
        (**self).signal_source_closed();
    }

    fn signal_ignored(&self, signal: TerminationSignal) {
        (**self).signal_ignored(signal);
    }

    fn shutdown_step_failed(&self, error: &ShutdownStepError) {
        (**self).shutdown_step_failed(error);
    }

    fn diagnostic_recorded(&self, diagnostic: &Diagnostic) {
        (**self).diagnostic_recorded(diagnostic);
    }

    fn stopped(&self, status: ExitStatus) {
        (**self).stopped(status);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn startup_begun(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "startup_begun",
            "starting tidepool"
        );
    }

    fn engine_ready(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "engine_ready",
            "engine ready"
        );
    }

    fn listener_ready(&self, endpoint: &SocketEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            transport = endpoint.transport(),
            endpoint = %endpoint,
            "listener ready"
        );
    }

    fn running(&self, endpoint: &SocketEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "running",
            endpoint = %endpoint,
            "server started on {endpoint}"
        );
    }

    fn startup_failed(&self, error: &StartupError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "startup_failed",
            error = %error,
            "failed to start tidepool"
        );
    }

    fn signal_received(&self, signal: TerminationSignal) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "signal_received",
            signal = signal.name(),
            "received {signal}, shutting down gracefully"
        );
    }

    fn signal_source_closed(&self) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "signal_source_closed",
            "signal source closed, shutting down"
        );
    }

    fn signal_ignored(&self, signal: TerminationSignal) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "signal_ignored",
            signal = signal.name(),
            "shutdown already in progress"
        );
    }

    fn shutdown_step_failed(&self, error: &ShutdownStepError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "shutdown_step_failed",
            stage = %error.stage(),
            error = %error,
            "error during shutdown"
        );
    }

    fn diagnostic_recorded(&self, diagnostic: &Diagnostic) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "diagnostic_recorded",
            stage = %diagnostic.stage,
            message = %diagnostic.message,
            "non-fatal problem recorded"
        );
    }

    fn stopped(&self, status: ExitStatus) {
        match status {
            ExitStatus::Graceful => tracing::info!(
                target: HEALTH_TARGET,
                event = "stopped",
                exit_code = status.code(),
                "server stopped and database closed"
            ),
            ExitStatus::StartupFailure => tracing::error!(
                target: HEALTH_TARGET,
                event = "stopped",
                exit_code = status.code(),
                "exiting after failed startup"
            ),
        }
    }
}
