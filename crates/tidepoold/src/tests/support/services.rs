//! Recording doubles for the services the supervisor sequences.
//!
//! Every call lands in one shared log so scenarios can assert on ordering
//! across the engine and listener, and each step can be told to fail.

use std::io;
use std::sync::{Arc, Mutex};

use tidepool_config::SocketEndpoint;

use crate::diagnostics::{Diagnostic, DiagnosticStage, Diagnostics};
use crate::engine::{EngineError, EngineInitError};
use crate::supervisor::{EngineLifecycle, LifecycleServices, ListenerLifecycle};
use crate::transport::ListenerError;

/// A lifecycle call observed by the doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCall {
    StartEngine,
    StartListener,
    StopListener,
    CloseEngine,
}

/// Steps that should fail when invoked.
#[derive(Debug, Default, Clone, Copy)]
pub struct Failures {
    pub engine_start: bool,
    pub listener_start: bool,
    pub listener_stop: bool,
    pub engine_close: bool,
    /// Binding records a socket hygiene diagnostic before it succeeds or fails.
    pub hygiene_warning: bool,
}

type CallLog = Arc<Mutex<Vec<ServiceCall>>>;

fn log_call(log: &CallLog, call: ServiceCall) {
    log.lock().expect("call log mutex poisoned").push(call);
}

/// Services double recording each lifecycle call.
#[derive(Debug, Clone)]
pub struct RecordingServices {
    calls: CallLog,
    failures: Failures,
    endpoint: SocketEndpoint,
}

impl RecordingServices {
    #[must_use]
    pub fn new(failures: Failures) -> Self {
        Self {
            calls: Arc::default(),
            failures,
            endpoint: SocketEndpoint::tcp("127.0.0.1", 5432),
        }
    }

    /// Snapshot of the calls made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }
}

impl LifecycleServices for RecordingServices {
    type Engine = RecordingEngine;
    type Listener = RecordingListener;

    fn start_engine(&mut self) -> Result<RecordingEngine, EngineInitError> {
        log_call(&self.calls, ServiceCall::StartEngine);
        if self.failures.engine_start {
            return Err(EngineInitError::UnknownExtension {
                name: "missing".to_owned(),
                available: String::new(),
            });
        }
        Ok(RecordingEngine {
            calls: Arc::clone(&self.calls),
            fail_close: self.failures.engine_close,
        })
    }

    fn start_listener(
        &mut self,
        _engine: &RecordingEngine,
        diagnostics: &mut Diagnostics,
    ) -> Result<RecordingListener, ListenerError> {
        log_call(&self.calls, ServiceCall::StartListener);
        if self.failures.hygiene_warning {
            diagnostics.push(Diagnostic::new(
                DiagnosticStage::SocketHygiene,
                "stale socket could not be removed",
            ));
        }
        if self.failures.listener_start {
            return Err(ListenerError::BindTcp {
                addr: ([127, 0, 0, 1], 5432).into(),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            });
        }
        Ok(RecordingListener {
            calls: Arc::clone(&self.calls),
            fail_stop: self.failures.listener_stop,
            endpoint: self.endpoint.clone(),
        })
    }
}

#[derive(Debug)]
pub struct RecordingEngine {
    calls: CallLog,
    fail_close: bool,
}

impl EngineLifecycle for RecordingEngine {
    fn close(self) -> Result<(), EngineError> {
        log_call(&self.calls, ServiceCall::CloseEngine);
        if self.fail_close {
            Err(EngineError::WorkerPanic)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct RecordingListener {
    calls: CallLog,
    fail_stop: bool,
    endpoint: SocketEndpoint,
}

impl ListenerLifecycle for RecordingListener {
    fn endpoint(&self) -> SocketEndpoint {
        self.endpoint.clone()
    }

    fn stop(self) -> Result<(), ListenerError> {
        log_call(&self.calls, ServiceCall::StopListener);
        if self.fail_stop {
            Err(ListenerError::ThreadPanic)
        } else {
            Ok(())
        }
    }
}
