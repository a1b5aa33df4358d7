//! Non-fatal problems collected while the daemon starts and stops.
//!
//! Errors that must not abort the lifecycle (stale socket removal, shutdown
//! steps, cleanup after a failed start) are recorded here instead of being
//! dropped, so the final outcome still carries them.

use std::fmt;

/// Lifecycle step that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticStage {
    /// Removing a stale Unix socket file before bind.
    SocketHygiene,
    /// Stopping the listener during shutdown.
    ListenerStop,
    /// Closing the engine during shutdown.
    EngineClose,
    /// Releasing services after a startup step failed.
    StartupCleanup,
}

impl DiagnosticStage {
    /// Stable label used in log events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SocketHygiene => "socket_hygiene",
            Self::ListenerStop => "listener_stop",
            Self::EngineClose => "engine_close",
            Self::StartupCleanup => "startup_cleanup",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A swallowed error, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: DiagnosticStage,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(stage: DiagnosticStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.stage, self.message)
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Appends `diagnostic` when present.
    pub fn extend_from(&mut self, diagnostic: Option<Diagnostic>) {
        self.entries.extend(diagnostic);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Whether any entry was produced by `stage`.
    #[must_use]
    pub fn contains_stage(&self, stage: DiagnosticStage) -> bool {
        self.entries.iter().any(|entry| entry.stage == stage)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
