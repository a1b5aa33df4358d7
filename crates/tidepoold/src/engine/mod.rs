//! Embedded relational engine owned by a dedicated worker thread.
//!
//! The engine is SQLite accessed through `rusqlite`. [`Engine::open`] opens the
//! database and installs every requested extension on the calling thread, and
//! only then hands the connection to a worker thread. Callers talk to the
//! worker through a cloneable [`EngineHandle`] which forwards commands over a
//! bounded channel and waits on a per-request reply channel.

mod errors;
mod extensions;
mod worker;

use std::fmt;
use std::fs;
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use camino::Utf8PathBuf;
use rusqlite::Connection;
use tracing::{debug, info};

pub use self::errors::{EngineError, EngineInitError};
pub use self::extensions::{
    Extension, ExtensionRegistry, ExtensionSet, ForeignKeys, PgCompat,
};
pub use rusqlite::types::Value as SqlValue;

use self::worker::{EngineCommand, run_worker};

pub(crate) const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// Commands buffered before callers block on the worker.
const COMMAND_QUEUE_DEPTH: usize = 64;

/// Where the engine keeps its data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineStorage {
    /// Private in-memory database, discarded on close.
    #[default]
    Memory,
    /// Database file on disk. The parent directory is created when missing.
    File(Utf8PathBuf),
}

impl EngineStorage {
    /// Storage derived from an optional database file path.
    #[must_use]
    pub fn from_path(path: Option<Utf8PathBuf>) -> Self {
        path.map_or(Self::Memory, Self::File)
    }

    fn connect(&self) -> Result<Connection, EngineInitError> {
        match self {
            Self::Memory => Connection::open_in_memory(),
            Self::File(path) => {
                if let Some(parent) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(|source| EngineInitError::Storage {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                Connection::open(path.as_std_path())
            }
        }
        .map_err(|source| EngineInitError::Open {
            storage: self.to_string(),
            source,
        })
    }
}

impl fmt::Display for EngineStorage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => formatter.write_str(":memory:"),
            Self::File(path) => write!(formatter, "{path}"),
        }
    }
}

/// Result of running a single SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The statement produced a result set.
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    },
    /// The statement produced no result set.
    Done { changes: usize },
}

/// Entry point for creating the process's engine instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    /// Opens the engine and installs `extensions` in order.
    ///
    /// Either every extension is installed and the worker thread is running,
    /// or an [`EngineInitError`] is returned and nothing is left behind.
    pub fn open(
        storage: &EngineStorage,
        extensions: &ExtensionSet,
    ) -> Result<EngineHandle, EngineInitError> {
        let connection = storage.connect()?;
        for extension in extensions.iter() {
            extension
                .install(&connection)
                .map_err(|source| EngineInitError::Extension {
                    name: extension.name().to_owned(),
                    source,
                })?;
            debug!(
                target: ENGINE_TARGET,
                extension = extension.name(),
                "extension installed"
            );
        }

        let (sender, receiver) = mpsc::sync_channel(COMMAND_QUEUE_DEPTH);
        let worker = thread::Builder::new()
            .name("tidepool-engine".to_owned())
            .spawn(move || run_worker(connection, receiver))
            .map_err(|source| EngineInitError::Spawn { source })?;

        info!(
            target: ENGINE_TARGET,
            storage = %storage,
            extensions = ?extensions.names(),
            "engine opened"
        );
        Ok(EngineHandle {
            shared: Arc::new(EngineShared {
                storage: storage.clone(),
                sender: Mutex::new(Some(sender)),
                worker: Mutex::new(Some(worker)),
            }),
        })
    }
}

/// Cloneable handle to the running engine.
///
/// Every clone refers to the same worker. Closing through any clone closes the
/// engine for all of them; subsequent calls return [`EngineError::Closed`].
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
}

struct EngineShared {
    storage: EngineStorage,
    sender: Mutex<Option<SyncSender<EngineCommand>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EngineHandle")
            .field("storage", &self.shared.storage)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl EngineHandle {
    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Runs one SQL statement and waits for its outcome.
    pub fn execute(&self, sql: &str) -> Result<QueryOutcome, EngineError> {
        let sender = self
            .shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(EngineError::Closed)?;
        let (reply, response) = mpsc::channel();
        sender
            .send(EngineCommand::Execute {
                sql: sql.to_owned(),
                reply,
            })
            .map_err(|_| EngineError::Closed)?;
        response.recv().map_err(|_| EngineError::Closed)?
    }

    /// Closes the engine, waiting for the worker to release the connection.
    ///
    /// Only the first call does any work; later calls return
    /// [`EngineError::Closed`].
    pub fn close(&self) -> Result<(), EngineError> {
        let sender = self
            .shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(EngineError::Closed)?;
        let (reply, response) = mpsc::channel();
        let sent = sender.send(EngineCommand::Close { reply }).is_ok();
        drop(sender);

        let outcome = if sent {
            response.recv().unwrap_or(Err(EngineError::WorkerPanic))
        } else {
            Err(EngineError::WorkerPanic)
        };

        let worker = self
            .shared
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            return Err(EngineError::WorkerPanic);
        }

        if outcome.is_ok() {
            info!(
                target: ENGINE_TARGET,
                storage = %self.shared.storage,
                "engine closed"
            );
        }
        outcome
    }
}
