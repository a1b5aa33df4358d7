//! The tidepool daemon.
//!
//! `tidepoold` embeds a relational engine in-process and exposes it to local
//! clients over a TCP or Unix domain socket selected through
//! [`tidepool_config`]. The process shell is deliberately small:
//!
//! 1. open the [`engine`] with the configured extension set;
//! 2. bind the [`transport`] listener, clearing any stale Unix socket file;
//! 3. install `SIGINT`/`SIGTERM` handlers and wait;
//! 4. on a signal, stop the listener, close the engine and exit with status 0.
//!
//! Any startup failure exits with status 1. Problems that must not abort the
//! lifecycle are collected as [`Diagnostic`]s and returned in the
//! [`SupervisorOutcome`](supervisor::SupervisorOutcome).

mod bootstrap;
mod diagnostics;
pub mod engine;
mod health;
mod launch;
pub mod supervisor;
mod telemetry;
pub mod transport;

pub use bootstrap::{ConfigLoader, SystemConfigLoader};
pub use diagnostics::{Diagnostic, DiagnosticStage, Diagnostics};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use launch::{LaunchError, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
