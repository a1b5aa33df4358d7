//! Error surface of the lifecycle supervisor.

use thiserror::Error;

use crate::diagnostics::DiagnosticStage;
use crate::engine::{EngineError, EngineInitError};
use crate::transport::ListenerError;

use super::signals::SignalInstallError;

/// A startup step failed. Fatal: the process exits with status 1.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("engine failed to start: {source}")]
    Engine {
        #[source]
        source: EngineInitError,
    },
    #[error("listener failed to start: {source}")]
    Listener {
        #[source]
        source: ListenerError,
    },
    #[error("signal handlers could not be installed: {source}")]
    Signals {
        #[source]
        source: SignalInstallError,
    },
}

/// A shutdown step failed. Recorded and reported; shutdown carries on.
#[derive(Debug, Error)]
pub enum ShutdownStepError {
    #[error("listener did not stop cleanly: {source}")]
    Listener {
        #[source]
        source: ListenerError,
    },
    #[error("engine did not close cleanly: {source}")]
    Engine {
        #[source]
        source: EngineError,
    },
}

impl ShutdownStepError {
    /// Diagnostic stage matching the failed step.
    #[must_use]
    pub fn stage(&self) -> DiagnosticStage {
        match self {
            Self::Listener { .. } => DiagnosticStage::ListenerStop,
            Self::Engine { .. } => DiagnosticStage::EngineClose,
        }
    }
}
