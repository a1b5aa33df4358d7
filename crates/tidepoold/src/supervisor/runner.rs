//! The supervisor's control thread.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, DiagnosticStage, Diagnostics};
use crate::health::HealthReporter;

use super::SUPERVISOR_TARGET;
use super::errors::{ShutdownStepError, StartupError};
use super::outcome::{ExitStatus, SupervisorOutcome};
use super::services::{EngineLifecycle, LifecycleServices, ListenerLifecycle};
use super::signals::{SignalSource, TerminationSignal};
use super::state::{LifecycleState, Transition};

/// Runs the daemon lifecycle on the calling thread.
///
/// Startup is engine, then listener, then signal handlers. The supervisor then
/// blocks until a termination signal arrives and shuts down in reverse: the
/// listener is stopped before the engine is closed. Shutdown step failures are
/// recorded and never change the exit status.
pub struct Supervisor<S, G> {
    services: S,
    signals: G,
    reporter: Arc<dyn HealthReporter>,
    state: LifecycleState,
    diagnostics: Diagnostics,
}

impl<S, G> Supervisor<S, G>
where
    S: LifecycleServices,
    G: SignalSource,
{
    #[must_use]
    pub fn new(services: S, signals: G, reporter: Arc<dyn HealthReporter>) -> Self {
        Self {
            services,
            signals,
            reporter,
            state: LifecycleState::Starting,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Runs until shutdown completes or startup fails.
    pub fn run(mut self) -> SupervisorOutcome {
        self.reporter.startup_begun();

        let engine = match self.services.start_engine() {
            Ok(engine) => engine,
            Err(source) => {
                return self.fail_startup(StartupError::Engine { source }, None, None);
            }
        };
        self.reporter.engine_ready();

        let recorded = self.diagnostics.len();
        let started = self.services.start_listener(&engine, &mut self.diagnostics);
        self.report_recorded_since(recorded);
        let listener = match started {
            Ok(listener) => listener,
            Err(source) => {
                return self.fail_startup(StartupError::Listener { source }, Some(engine), None);
            }
        };
        let endpoint = listener.endpoint();
        self.reporter.listener_ready(&endpoint);

        let subscription = match self.signals.install() {
            Ok(subscription) => subscription,
            Err(source) => {
                return self.fail_startup(
                    StartupError::Signals { source },
                    Some(engine),
                    Some(listener),
                );
            }
        };

        self.transition(LifecycleState::Running);
        self.reporter.running(&endpoint);

        let signal = subscription.wait();
        match signal {
            Some(signal) => self.reporter.signal_received(signal),
            None => self.reporter.signal_source_closed(),
        }
        self.transition(LifecycleState::Stopping);

        self.stop_listener(listener);
        self.close_engine(engine);

        for late in subscription.drain() {
            self.ignore_signal(late);
        }
        drop(subscription);

        self.finish(ExitStatus::Graceful, signal, None)
    }

    fn stop_listener(&mut self, listener: S::Listener) {
        if let Err(source) = listener.stop() {
            self.record_step_failure(ShutdownStepError::Listener { source });
        }
    }

    fn close_engine(&mut self, engine: S::Engine) {
        if let Err(source) = engine.close() {
            self.record_step_failure(ShutdownStepError::Engine { source });
        }
    }

    fn ignore_signal(&mut self, signal: TerminationSignal) {
        match self.state.begin_stopping() {
            Transition::AlreadyStopping => self.reporter.signal_ignored(signal),
            other => warn!(
                target: SUPERVISOR_TARGET,
                signal = signal.name(),
                transition = ?other,
                "late signal outside the stopping state"
            ),
        }
    }

    fn fail_startup(
        mut self,
        error: StartupError,
        engine: Option<S::Engine>,
        listener: Option<S::Listener>,
    ) -> SupervisorOutcome {
        self.reporter.startup_failed(&error);
        if let Some(listener) = listener
            && let Err(source) = listener.stop()
        {
            self.record(Diagnostic::new(
                DiagnosticStage::StartupCleanup,
                ShutdownStepError::Listener { source }.to_string(),
            ));
        }
        if let Some(engine) = engine
            && let Err(source) = engine.close()
        {
            self.record(Diagnostic::new(
                DiagnosticStage::StartupCleanup,
                ShutdownStepError::Engine { source }.to_string(),
            ));
        }
        self.finish(ExitStatus::StartupFailure, None, Some(error))
    }

    fn finish(
        mut self,
        exit_status: ExitStatus,
        signal: Option<TerminationSignal>,
        startup_error: Option<StartupError>,
    ) -> SupervisorOutcome {
        self.transition(LifecycleState::Stopped);
        self.reporter.stopped(exit_status);
        SupervisorOutcome {
            exit_status,
            final_state: self.state,
            signal,
            startup_error,
            diagnostics: self.diagnostics,
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        match self.state.advance(next) {
            Transition::Entered { from, to } => debug!(
                target: SUPERVISOR_TARGET,
                from = from.as_str(),
                to = to.as_str(),
                "lifecycle transition"
            ),
            other => warn!(
                target: SUPERVISOR_TARGET,
                requested = next.as_str(),
                transition = ?other,
                "lifecycle transition refused"
            ),
        }
    }

    fn record_step_failure(&mut self, error: ShutdownStepError) {
        self.reporter.shutdown_step_failed(&error);
        self.record(Diagnostic::new(error.stage(), error.to_string()));
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        self.reporter.diagnostic_recorded(&diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn report_recorded_since(&self, start: usize) {
        for diagnostic in self.diagnostics.iter().skip(start) {
            self.reporter.diagnostic_recorded(diagnostic);
        }
    }
}
