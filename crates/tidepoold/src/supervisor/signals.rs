//! Termination signal delivery.
//!
//! Signals arrive as [`TerminationSignal`] messages on a channel that the
//! supervisor's control thread blocks on. The production source runs the
//! `signal-hook` iterator on a dedicated thread and forwards into that channel.

use std::fmt;
use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::debug;

use super::SUPERVISOR_TARGET;

/// Signals that request a graceful shutdown. Both are handled identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl TerminationSignal {
    /// Maps a raw signal number.
    #[must_use]
    pub fn from_raw(signal: i32) -> Option<Self> {
        match signal {
            SIGINT => Some(Self::Interrupt),
            SIGTERM => Some(Self::Terminate),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
pub enum SignalInstallError {
    #[error("failed to register signal handlers: {source}")]
    Register {
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn signal forwarding thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
}

/// Installs termination handlers on demand.
pub trait SignalSource {
    /// Registers the handlers. They stay installed until the returned
    /// subscription is dropped.
    fn install(&self) -> Result<SignalSubscription, SignalInstallError>;
}

/// Receiving end of the signal channel.
pub struct SignalSubscription {
    receiver: Receiver<TerminationSignal>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SignalSubscription {
    /// Wraps a channel. `release` runs once, when the subscription drops.
    pub fn new(
        receiver: Receiver<TerminationSignal>,
        release: Option<Box<dyn FnOnce() + Send>>,
    ) -> Self {
        Self { receiver, release }
    }

    /// Blocks until a signal arrives. `None` means the source hung up.
    #[must_use]
    pub fn wait(&self) -> Option<TerminationSignal> {
        self.receiver.recv().ok()
    }

    /// Signals already queued, without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<TerminationSignal> {
        let mut pending = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(signal) => pending.push(signal),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return pending,
            }
        }
    }
}

impl fmt::Debug for SignalSubscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SignalSubscription")
            .field("installed", &self.release.is_some())
            .finish()
    }
}

impl Drop for SignalSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Source backed by the process's `SIGINT` and `SIGTERM` handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignalSource;

impl SignalSource for SystemSignalSource {
    fn install(&self) -> Result<SignalSubscription, SignalInstallError> {
        let mut signals = Signals::new([SIGINT, SIGTERM])
            .map_err(|source| SignalInstallError::Register { source })?;
        let handle = signals.handle();
        let (sender, receiver) = mpsc::channel();
        let forwarder = thread::Builder::new()
            .name("tidepool-signals".to_owned())
            .spawn(move || {
                for raw in signals.forever() {
                    let Some(signal) = TerminationSignal::from_raw(raw) else {
                        continue;
                    };
                    if sender.send(signal).is_err() {
                        break;
                    }
                }
            })
            .map_err(|source| SignalInstallError::Spawn { source })?;
        debug!(target: SUPERVISOR_TARGET, "signal handlers installed");

        Ok(SignalSubscription::new(
            receiver,
            Some(Box::new(move || {
                handle.close();
                let _ = forwarder.join();
                debug!(target: SUPERVISOR_TARGET, "signal handlers released");
            })),
        ))
    }
}
