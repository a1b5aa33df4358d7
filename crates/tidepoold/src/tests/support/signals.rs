//! Scripted signal source.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};

use crate::supervisor::{SignalInstallError, SignalSource, SignalSubscription, TerminationSignal};

/// Delivers signals to a running supervisor from another thread.
#[derive(Debug, Clone, Default)]
pub struct SignalTrigger {
    sender: Arc<Mutex<Option<Sender<TerminationSignal>>>>,
}

impl SignalTrigger {
    /// Sends `signal`, returning `false` when no handlers are installed.
    pub fn deliver(&self, signal: TerminationSignal) -> bool {
        self.sender
            .lock()
            .expect("signal trigger mutex poisoned")
            .as_ref()
            .is_some_and(|sender| sender.send(signal).is_ok())
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.sender
            .lock()
            .expect("signal trigger mutex poisoned")
            .is_some()
    }
}

/// Signal source whose deliveries are scripted by the test.
///
/// Queued signals are available as soon as handlers are installed. Without a
/// trigger the channel hangs up once the queue is consumed.
#[derive(Debug, Default)]
pub struct TestSignalSource {
    queued: Vec<TerminationSignal>,
    fail: bool,
    trigger: Option<SignalTrigger>,
    installs: Arc<AtomicUsize>,
}

impl TestSignalSource {
    /// Source that delivers `signals` in order.
    #[must_use]
    pub fn queued(signals: impl IntoIterator<Item = TerminationSignal>) -> Self {
        Self {
            queued: signals.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Source whose installation fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Source driven by the returned trigger.
    #[must_use]
    pub fn triggered() -> (SignalTrigger, Self) {
        let trigger = SignalTrigger::default();
        let source = Self {
            trigger: Some(trigger.clone()),
            ..Self::default()
        };
        (trigger, source)
    }

    /// Counter of successful and failed install attempts.
    #[must_use]
    pub fn installs(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.installs)
    }
}

impl SignalSource for TestSignalSource {
    fn install(&self) -> Result<SignalSubscription, SignalInstallError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SignalInstallError::Register {
                source: io::Error::other("signal registration refused"),
            });
        }

        let (sender, receiver) = mpsc::channel();
        for signal in &self.queued {
            sender
                .send(*signal)
                .expect("receiver is held by the subscription");
        }

        let Some(trigger) = self.trigger.clone() else {
            return Ok(SignalSubscription::new(receiver, None));
        };
        *trigger.sender.lock().expect("signal trigger mutex poisoned") = Some(sender);
        Ok(SignalSubscription::new(
            receiver,
            Some(Box::new(move || {
                trigger
                    .sender
                    .lock()
                    .expect("signal trigger mutex poisoned")
                    .take();
            })),
        ))
    }
}
