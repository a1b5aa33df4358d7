//! Protocol listener for the embedded engine.
//!
//! The transport module binds the configured TCP or Unix socket endpoint,
//! accepts connections on a background thread and serves each client on its
//! own session thread. Unix endpoints are cleared of stale socket files before
//! binding (see [`hygiene`]).

mod errors;
mod handler;
pub mod hygiene;
mod listener;
mod session;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionStream};
pub use self::listener::{ListenerHandle, SocketListener};
pub use self::session::EngineSessionHandler;
#[cfg(test)]
pub(crate) use self::test_utils::{BlockingHandler, CountingHandler};

pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
