//! Process entry: configuration, telemetry, then supervision.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::supervisor::{
    EmbeddedServices, SignalSource, Supervisor, SupervisorOutcome, SystemSignalSource,
};
use crate::telemetry::{self, TelemetryError};

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launch");

/// Failures before the supervisor runs. The process exits with status 1.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        #[source]
        source: TelemetryError,
    },
}

impl From<Arc<OrthoError>> for LaunchError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

/// Runs the daemon using the production collaborators.
pub fn run_daemon() -> Result<SupervisorOutcome, LaunchError> {
    run_daemon_with(
        &SystemConfigLoader,
        SystemSignalSource,
        Arc::new(StructuredHealthReporter::new()),
    )
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, G>(
    loader: &L,
    signals: G,
    reporter: Arc<dyn HealthReporter>,
) -> Result<SupervisorOutcome, LaunchError>
where
    L: ConfigLoader + ?Sized,
    G: SignalSource,
{
    let config = loader.load()?;
    telemetry::initialise(&config)?;
    info!(
        target: LAUNCH_TARGET,
        listen = %config.listen(),
        extensions = ?config.extensions(),
        data_dir = ?config.data_dir(),
        "configuration loaded"
    );

    let services = EmbeddedServices::from_config(&config);
    Ok(Supervisor::new(services, signals, reporter).run())
}
