//! Loopback Session Adapter
//!
//! An in-process implementation of the session ports over a
//! `crossbeam-channel` event queue. A [`LoopbackFeed`] scripts the
//! events a real venue would push; sessions created with an event
//! handler get them delivered on a dedicated delivery thread (owned by
//! the adapter, standing in for the external session's delivery
//! threads), while handler-less sessions hand them out through
//! [`Session::next_event`].
//!
//! The factory records every wire-facing call and can inject start/open
//! failures, which is what the error-path tests drive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use tracing::trace;

use crate::application::ports::events::{Correlation, Event};
use crate::application::ports::{
    EventHandler, ReferenceRequest, ServiceKind, Session, SessionError, SessionFactory,
    SessionOptions, SubscriptionEntry,
};

/// How often the delivery thread checks for shutdown between events.
const DELIVERY_POLL: Duration = Duration::from_millis(25);

// =============================================================================
// Wire Call Log
// =============================================================================

/// One wire-facing call observed by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum WireCall {
    /// A reference data request was submitted.
    Request(ReferenceRequest),
    /// A subscription list was issued.
    Subscribe(Vec<SubscriptionEntry>),
    /// The subscription list was replaced.
    Resubscribe(Vec<SubscriptionEntry>),
    /// A session was stopped.
    Stop,
}

// =============================================================================
// Factory
// =============================================================================

struct Shared {
    tx: Sender<Event>,
    rx: Receiver<Event>,
    fail_start: AtomicBool,
    fail_open: AtomicBool,
    calls: Mutex<Vec<WireCall>>,
}

impl Shared {
    fn record(&self, call: WireCall) {
        self.calls.lock().push(call);
    }
}

/// Factory for loopback sessions sharing one scripted event queue.
pub struct LoopbackFactory {
    shared: Arc<Shared>,
}

impl LoopbackFactory {
    /// Create a factory with an empty event queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            shared: Arc::new(Shared {
                tx,
                rx,
                fail_start: AtomicBool::new(false),
                fail_open: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Handle for scripting events into sessions of this factory.
    #[must_use]
    pub fn feed(&self) -> LoopbackFeed {
        LoopbackFeed {
            tx: self.shared.tx.clone(),
        }
    }

    /// Make subsequent `start` calls fail.
    pub fn fail_start(&self, fail: bool) {
        self.shared.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `open_service` calls fail.
    pub fn fail_open(&self, fail: bool) {
        self.shared.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every wire-facing call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<WireCall> {
        self.shared.calls.lock().clone()
    }
}

impl Default for LoopbackFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFactory for LoopbackFactory {
    fn create(
        &self,
        options: &SessionOptions,
        handler: Option<EventHandler>,
    ) -> Result<Box<dyn Session>, SessionError> {
        trace!(host = %options.host, port = options.port, "loopback session created");
        Ok(Box::new(LoopbackSession {
            shared: Arc::clone(&self.shared),
            rx: self.shared.rx.clone(),
            handler,
            stopped: Arc::new(AtomicBool::new(false)),
            delivery: None,
        }))
    }
}

/// Publisher handle scripting events into loopback sessions.
#[derive(Clone)]
pub struct LoopbackFeed {
    tx: Sender<Event>,
}

impl LoopbackFeed {
    /// Push one event for delivery.
    pub fn push(&self, event: Event) {
        // Receivers only vanish when the factory is gone.
        let _ = self.tx.send(event);
    }
}

// =============================================================================
// Session
// =============================================================================

struct LoopbackSession {
    shared: Arc<Shared>,
    rx: Receiver<Event>,
    handler: Option<EventHandler>,
    stopped: Arc<AtomicBool>,
    delivery: Option<JoinHandle<()>>,
}

impl Session for LoopbackSession {
    fn start(&mut self) -> Result<(), SessionError> {
        if self.shared.fail_start.load(Ordering::SeqCst) {
            return Err(SessionError::StartFailed);
        }

        // Handler sessions drain the queue on their own delivery thread.
        if let Some(handler) = self.handler.clone() {
            let rx = self.rx.clone();
            let stopped = Arc::clone(&self.stopped);
            self.delivery = Some(std::thread::spawn(move || {
                loop {
                    match rx.recv_timeout(DELIVERY_POLL) {
                        Ok(event) => handler(&event),
                        Err(RecvTimeoutError::Timeout) => {
                            if stopped.load(Ordering::SeqCst) {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            }));
        }

        Ok(())
    }

    fn open_service(&mut self, service: ServiceKind) -> Result<(), SessionError> {
        if self.shared.fail_open.load(Ordering::SeqCst) {
            return Err(SessionError::OpenFailed(service));
        }
        Ok(())
    }

    fn send_request(
        &mut self,
        _service: ServiceKind,
        request: &ReferenceRequest,
        _correlation: &Correlation,
    ) -> Result<(), SessionError> {
        self.shared.record(WireCall::Request(request.clone()));
        Ok(())
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Event, SessionError> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(event),
            Err(RecvTimeoutError::Timeout) => Err(SessionError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(SessionError::Closed),
        }
    }

    fn subscribe(&mut self, entries: &[SubscriptionEntry]) -> Result<(), SessionError> {
        self.shared.record(WireCall::Subscribe(entries.to_vec()));
        Ok(())
    }

    fn resubscribe(&mut self, entries: &[SubscriptionEntry]) -> Result<(), SessionError> {
        self.shared.record(WireCall::Resubscribe(entries.to_vec()));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        self.shared.record(WireCall::Stop);
        self.shutdown();
        Ok(())
    }
}

impl LoopbackSession {
    fn shutdown(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(handle) = self.delivery.take() {
            // A subscription dropped on the delivery thread ends up here
            // from that same thread; joining ourselves would deadlock.
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for LoopbackSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Tests
// =============================================================================
