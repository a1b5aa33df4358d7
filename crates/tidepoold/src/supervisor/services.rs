//! Services the supervisor starts and stops.
//!
//! The supervisor only sequences calls; what "engine" and "listener" mean is
//! supplied through [`LifecycleServices`]. Production wiring lives in
//! [`EmbeddedServices`].

use std::sync::Arc;

use tidepool_config::{Config, SocketEndpoint};

use crate::diagnostics::Diagnostics;
use crate::engine::{
    Engine, EngineError, EngineHandle, EngineInitError, EngineStorage, ExtensionRegistry,
};
use crate::transport::{EngineSessionHandler, ListenerError, ListenerHandle, SocketListener};

/// A started engine, closed exactly once by the supervisor.
pub trait EngineLifecycle {
    fn close(self) -> Result<(), EngineError>;
}

/// A started listener, stopped exactly once by the supervisor.
pub trait ListenerLifecycle {
    /// Endpoint clients can reach.
    fn endpoint(&self) -> SocketEndpoint;

    fn stop(self) -> Result<(), ListenerError>;
}

/// Starts the services the supervisor manages.
pub trait LifecycleServices {
    type Engine: EngineLifecycle;
    type Listener: ListenerLifecycle;

    fn start_engine(&mut self) -> Result<Self::Engine, EngineInitError>;

    /// Starts the listener bound to `engine`. Non-fatal problems met while
    /// binding go into `diagnostics`.
    fn start_listener(
        &mut self,
        engine: &Self::Engine,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self::Listener, ListenerError>;
}

impl EngineLifecycle for EngineHandle {
    fn close(self) -> Result<(), EngineError> {
        EngineHandle::close(&self)
    }
}

impl ListenerLifecycle for ListenerHandle {
    fn endpoint(&self) -> SocketEndpoint {
        ListenerHandle::endpoint(self).clone()
    }

    fn stop(self) -> Result<(), ListenerError> {
        ListenerHandle::stop(self)
    }
}

/// The embedded engine served over a socket listener.
#[derive(Clone)]
pub struct EmbeddedServices {
    storage: EngineStorage,
    extensions: Vec<String>,
    registry: ExtensionRegistry,
    endpoint: SocketEndpoint,
}

impl EmbeddedServices {
    #[must_use]
    pub fn new(
        storage: EngineStorage,
        extensions: Vec<String>,
        registry: ExtensionRegistry,
        endpoint: SocketEndpoint,
    ) -> Self {
        Self {
            storage,
            extensions,
            registry,
            endpoint,
        }
    }

    /// Services described by `config`, resolving extensions against the
    /// built-in registry.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            EngineStorage::from_path(config.engine_storage_path()),
            config.extensions().to_vec(),
            ExtensionRegistry::builtin(),
            config.listen().clone(),
        )
    }
}

impl LifecycleServices for EmbeddedServices {
    type Engine = EngineHandle;
    type Listener = ListenerHandle;

    fn start_engine(&mut self) -> Result<EngineHandle, EngineInitError> {
        let extensions = self.registry.resolve(self.extensions.as_slice())?;
        Engine::open(&self.storage, &extensions)
    }

    fn start_listener(
        &mut self,
        engine: &EngineHandle,
        diagnostics: &mut Diagnostics,
    ) -> Result<ListenerHandle, ListenerError> {
        let listener = SocketListener::bind(&self.endpoint, diagnostics)?;
        listener.start(Arc::new(EngineSessionHandler::new(engine.clone())))
    }
}
