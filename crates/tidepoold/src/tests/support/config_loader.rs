//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;
use tidepool_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader returning a fixed configuration rooted in a temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
    config: Config,
}

impl TestConfigLoader {
    /// TCP listener on an ephemeral loopback port with an in-memory engine.
    #[must_use]
    pub fn tcp() -> Self {
        Self::with_listen(|_| SocketEndpoint::tcp("127.0.0.1", 0))
    }

    /// Unix listener whose socket lives under the loader's directory.
    #[must_use]
    pub fn unix() -> Self {
        Self::with_listen(|dir| SocketEndpoint::unix(dir.join("run").join(".s.PGSQL.5432")))
    }

    fn with_listen(listen: impl FnOnce(&Utf8PathBuf) -> SocketEndpoint) -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .expect("temporary directory path was not valid UTF-8");
        let config = Config {
            listen: listen(&root),
            ..Config::default()
        };
        Self { dir, config }
    }

    /// Persists the engine under the loader's directory.
    #[must_use]
    pub fn with_data_dir(mut self) -> Self {
        let data = self.dir.path().join("data");
        self.config.data_dir = Some(
            Utf8PathBuf::from_path_buf(data).expect("temporary data path was not valid UTF-8"),
        );
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, names: &[&str]) -> Self {
        self.config.extensions = names.iter().map(|name| (*name).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that intentionally fails by passing an invalid CLI argument.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("tidepoold"),
            OsString::from("--listen"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
