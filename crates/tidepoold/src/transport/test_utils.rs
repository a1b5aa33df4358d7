//! Test helpers for the transport module.

use std::io::Read;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::{ConnectionHandler, ConnectionStream};

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Holds each session open until the peer or the listener closes the stream.
pub(crate) struct BlockingHandler {
    started: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
}

impl BlockingHandler {
    /// Returns `(started, finished, handler)`.
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<Self>) {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            started: Arc::clone(&started),
            finished: Arc::clone(&finished),
        });
        (started, finished, handler)
    }
}

impl ConnectionHandler for BlockingHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let mut sink = Vec::new();
        let _ = stream.read_to_end(&mut sink);
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}
