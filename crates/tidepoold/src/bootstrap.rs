//! Configuration loading for the daemon.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};

use tidepool_config::Config;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`], layering defaults, the
/// configuration file, `TIDEPOOL_*` variables and command-line flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}
