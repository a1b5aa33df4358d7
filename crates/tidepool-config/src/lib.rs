//! Shared configuration for the tidepool daemon.
//!
//! Settings are layered by [`ortho_config`]: built-in defaults, then an
//! optional configuration file (`--config-path` or `TIDEPOOL_CONFIG_PATH`),
//! then `TIDEPOOL_*` environment variables, then command-line flags. The
//! resolved [`Config`] selects the listener endpoint (TCP or Unix domain
//! socket), the extension set handed to the embedded engine, where the engine
//! stores its data, and how the daemon logs.

mod defaults;
mod logging;
mod socket;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_TCP_HOST, DEFAULT_TCP_PORT, ENGINE_FILE_NAME, SOCKET_FILE_NAME,
    default_listen_endpoint, default_log_filter, default_log_filter_string, default_log_format,
    default_unix_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TIDEPOOL")]
pub struct Config {
    /// Endpoint the protocol listener binds to.
    #[serde(default = "defaults::default_listen_endpoint")]
    #[ortho_config(default = defaults::default_listen_endpoint())]
    pub listen: SocketEndpoint,
    /// Names of the engine extensions to install, in order.
    #[serde(default)]
    #[ortho_config(default = Vec::new())]
    pub extensions: Vec<String>,
    /// Directory holding the engine's database file. Unset keeps the engine
    /// in memory.
    #[serde(default)]
    pub data_dir: Option<Utf8PathBuf>,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            extensions: Vec::new(),
            data_dir: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint the listener binds to.
    #[must_use]
    pub fn listen(&self) -> &SocketEndpoint {
        &self.listen
    }

    /// Extension names requested for the engine.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        self.extensions.as_slice()
    }

    /// Configured data directory, if any.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Utf8Path> {
        self.data_dir.as_deref()
    }

    /// Database file used by the engine, or `None` for an in-memory engine.
    #[must_use]
    pub fn engine_storage_path(&self) -> Option<Utf8PathBuf> {
        self.data_dir().map(|dir| dir.join(ENGINE_FILE_NAME))
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
