//! Lifecycle supervision for the daemon.
//!
//! A [`Supervisor`] owns the [`LifecycleState`] and performs every lifecycle
//! step on one control thread: start the engine, start the listener, install
//! signal handlers, wait for a [`TerminationSignal`], then stop the listener
//! and close the engine. Signals reach the control thread as messages on a
//! channel (see [`SignalSource`]).

mod errors;
mod outcome;
mod runner;
mod services;
mod signals;
mod state;

pub use self::errors::{ShutdownStepError, StartupError};
pub use self::outcome::{ExitStatus, SupervisorOutcome};
pub use self::runner::Supervisor;
pub use self::services::{
    EmbeddedServices, EngineLifecycle, LifecycleServices, ListenerLifecycle,
};
pub use self::signals::{
    SignalInstallError, SignalSource, SignalSubscription, SystemSignalSource, TerminationSignal,
};
pub use self::state::{LifecycleState, Transition};

pub(crate) const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");
