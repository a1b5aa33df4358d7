//! Test doubles shared by the daemon's behavioural suites.

mod config_loader;
mod reporter;
mod services;
mod signals;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use services::{Failures, RecordingServices, ServiceCall};
pub use signals::{SignalTrigger, TestSignalSource};
