//! Error types for the embedded engine.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while opening the engine. No handle exists when one occurs.
#[derive(Debug, Error)]
pub enum EngineInitError {
    /// The storage directory could not be created.
    #[error("failed to create engine storage directory '{path}': {source}")]
    Storage {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// The database could not be opened.
    #[error("failed to open engine storage {storage}: {source}")]
    Open {
        storage: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Configuration named an extension the registry does not know.
    #[error("unknown engine extension '{name}' (available: {available})")]
    UnknownExtension { name: String, available: String },
    /// An extension failed to install on the connection.
    #[error("failed to install engine extension '{name}': {source}")]
    Extension {
        name: String,
        #[source]
        source: rusqlite::Error,
    },
    /// The worker thread could not be spawned.
    #[error("failed to spawn engine worker: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
}

/// Errors raised by an open [`EngineHandle`](super::EngineHandle).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine was already closed.
    #[error("engine is closed")]
    Closed,
    /// A statement failed to prepare or run.
    #[error("statement failed: {source}")]
    Statement {
        #[source]
        source: rusqlite::Error,
    },
    /// The connection reported an error while closing.
    #[error("failed to close engine: {source}")]
    Close {
        #[source]
        source: rusqlite::Error,
    },
    /// The worker thread stopped without replying.
    #[error("engine worker terminated unexpectedly")]
    WorkerPanic,
}
