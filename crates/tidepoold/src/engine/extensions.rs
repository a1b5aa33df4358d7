//! Named engine extensions and the registry that resolves them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use tracing::debug;

use super::{ENGINE_TARGET, EngineInitError};

/// Version string reported by the `version()` SQL function.
const PG_COMPAT_VERSION: &str = "PostgreSQL 16.4 (tidepool)";

/// Role reported by the `current_user()` SQL function.
const PG_COMPAT_USER: &str = "postgres";

/// A capability installed on the engine connection before it serves clients.
pub trait Extension: Send + Sync {
    /// Name used to request the extension from configuration.
    fn name(&self) -> &'static str;

    /// Installs the extension on a freshly opened connection.
    fn install(&self, connection: &Connection) -> Result<(), rusqlite::Error>;
}

/// Ordered set of extensions handed to [`Engine::open`](super::Engine::open).
///
/// Names are unique within a set; adding a name twice keeps the first entry.
#[derive(Clone, Default)]
pub struct ExtensionSet {
    entries: Vec<Arc<dyn Extension>>,
}

impl ExtensionSet {
    /// Empty set, the engine default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `extension` unless an extension with the same name is present.
    /// Returns `false` when the extension was skipped.
    pub fn insert(&mut self, extension: Arc<dyn Extension>) -> bool {
        if self.contains(extension.name()) {
            return false;
        }
        self.entries.push(extension);
        true
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, extension: Arc<dyn Extension>) -> Self {
        self.insert(extension);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name() == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Extension names in installation order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name()).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<dyn Extension>> {
        self.entries.iter()
    }
}

impl fmt::Debug for ExtensionSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.names()).finish()
    }
}

/// Resolves configured extension names to implementations.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    known: BTreeMap<&'static str, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Registry holding the built-in extensions.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(ForeignKeys));
        registry.register(Arc::new(PgCompat));
        registry
    }

    /// Registers `extension`, replacing any previous entry with the same name.
    pub fn register(&mut self, extension: Arc<dyn Extension>) {
        self.known.insert(extension.name(), extension);
    }

    /// Names the registry can resolve, sorted.
    #[must_use]
    pub fn available(&self) -> Vec<&'static str> {
        self.known.keys().copied().collect()
    }

    /// Builds the extension set for `names`, preserving their order.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<ExtensionSet, EngineInitError> {
        let mut set = ExtensionSet::new();
        for name in names {
            let name: &str = name.as_ref();
            let extension =
                self.known
                    .get(name)
                    .ok_or_else(|| EngineInitError::UnknownExtension {
                        name: name.to_owned(),
                        available: self.available().join(", "),
                    })?;
            if !set.insert(Arc::clone(extension)) {
                debug!(
                    target: ENGINE_TARGET,
                    extension = name,
                    "duplicate extension ignored"
                );
            }
        }
        Ok(set)
    }
}

/// Turns on foreign-key enforcement for the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForeignKeys;

impl Extension for ForeignKeys {
    fn name(&self) -> &'static str {
        "foreign_keys"
    }

    fn install(&self, connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute_batch("PRAGMA foreign_keys = ON")
    }
}

/// PostgreSQL-flavoured helper functions: `version()` and `current_user()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgCompat;

impl Extension for PgCompat {
    fn name(&self) -> &'static str {
        "pg_compat"
    }

    fn install(&self, connection: &Connection) -> Result<(), rusqlite::Error> {
        let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
        connection.create_scalar_function("version", 0, flags, |_| {
            Ok(format!(
                "{PG_COMPAT_VERSION}, SQLite {}",
                rusqlite::version()
            ))
        })?;
        connection.create_scalar_function("current_user", 0, flags, |_| {
            Ok(PG_COMPAT_USER.to_owned())
        })
    }
}
