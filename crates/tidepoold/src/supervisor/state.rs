//! Lifecycle state machine owned by the supervisor.

use std::fmt;

/// Phase of the daemon lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// Moves to `next` when the lifecycle allows it.
    ///
    /// Legal moves are `Starting → Running`, `Starting → Stopped` (failed
    /// start), `Running → Stopping` and `Stopping → Stopped`. Asking for
    /// `Stopping` while already stopping is a no-op reported as
    /// [`Transition::AlreadyStopping`]. Anything else leaves the state
    /// unchanged.
    pub fn advance(&mut self, next: Self) -> Transition {
        match (*self, next) {
            (Self::Stopping, Self::Stopping) => Transition::AlreadyStopping,
            (Self::Starting, Self::Running)
            | (Self::Starting, Self::Stopped)
            | (Self::Running, Self::Stopping)
            | (Self::Stopping, Self::Stopped) => {
                let from = *self;
                *self = next;
                Transition::Entered { from, to: next }
            }
            (from, to) => Transition::Rejected { from, to },
        }
    }

    /// Enters `Stopping`, at most once.
    pub fn begin_stopping(&mut self) -> Transition {
        self.advance(Self::Stopping)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Result of asking the state machine to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Entered {
        from: LifecycleState,
        to: LifecycleState,
    },
    AlreadyStopping,
    Rejected {
        from: LifecycleState,
        to: LifecycleState,
    },
}
