//! What a supervisor run produced.

use std::process::ExitCode;

use crate::diagnostics::Diagnostics;

use super::errors::StartupError;
use super::signals::TerminationSignal;
use super::state::LifecycleState;

/// Process exit status chosen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Shutdown completed, whether or not every step succeeded.
    Graceful,
    /// A startup step failed.
    StartupFailure,
}

impl ExitStatus {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Graceful => 0,
            Self::StartupFailure => 1,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

/// Result of [`Supervisor::run`](super::Supervisor::run).
#[derive(Debug)]
pub struct SupervisorOutcome {
    pub exit_status: ExitStatus,
    /// Lifecycle state when the run returned.
    pub final_state: LifecycleState,
    /// Signal that triggered shutdown, if one did.
    pub signal: Option<TerminationSignal>,
    /// The failed startup step, for `StartupFailure` outcomes.
    pub startup_error: Option<StartupError>,
    /// Errors swallowed during the run.
    pub diagnostics: Diagnostics,
}
