//! Session Ports
//!
//! Contracts for the external session/transport collaborator. The crate
//! never talks to a wire itself; it drives these traits. Adapters own
//! connecting, authenticating, and encoding; this side owns what gets
//! requested and how delivered events are folded into the typed store.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`SessionFactory`]: opens sessions from options, optionally wiring
//!   an event handler invoked on the adapter's delivery thread(s)
//! - [`Session`]: one open session: service lifecycle, request
//!   submission, bounded event polling, subscription management

use std::sync::Arc;
use std::time::Duration;

use crate::domain::security::Override;

pub mod events;

use events::{Correlation, Event};

// =============================================================================
// Services
// =============================================================================

/// Services reachable through a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// Synchronous reference data request/response.
    ReferenceData,
    /// Streaming market data subscriptions.
    MarketData,
    /// Custom volume-weighted average price service.
    CustomVwap,
    /// Market bar subscription service.
    MarketBar,
    /// Field information service.
    FieldInformation,
    /// Technical analysis service.
    TechnicalAnalysis,
}

impl ServiceKind {
    /// Wire name used to open the service.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReferenceData => "//blp/refdata",
            Self::MarketData => "//blp/mktdata",
            Self::CustomVwap => "//blp/mktvwap",
            Self::MarketBar => "//blp/mktbar",
            Self::FieldInformation => "//blp/apiflds",
            Self::TechnicalAnalysis => "//blp/tasvc",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failures surfaced by a session adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session could not be started.
    #[error("failed to start session")]
    StartFailed,

    /// A service could not be opened on a started session.
    #[error("failed to open service `{0}`")]
    OpenFailed(ServiceKind),

    /// The adapter ran out of resources creating the session.
    #[error("session resources exhausted")]
    Exhausted,

    /// No event arrived within the polling bound.
    #[error("timed out waiting for an event")]
    Timeout,

    /// The session has terminated and can deliver nothing further.
    #[error("session terminated")]
    Terminated,

    /// The session was closed locally.
    #[error("session closed")]
    Closed,
}

// =============================================================================
// Requests
// =============================================================================

/// Options used to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
}

/// Default session endpoint.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default session port.
pub const DEFAULT_PORT: u16 = 8194;

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
        }
    }
}

/// One synchronous reference data request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRequest {
    /// Instrument the request is about.
    pub ticker: String,
    /// Fields requested, in request order.
    pub fields: Vec<String>,
    /// Overrides applied server-side, in field-id order.
    pub overrides: Vec<Override>,
}

/// One entry in a streaming subscription list.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEntry {
    /// Instrument to stream.
    pub ticker: Arc<str>,
    /// Correlation echoed on every event for this entry.
    pub correlation: Correlation,
    /// Fields streamed for the instrument.
    pub fields: Vec<String>,
    /// Adapter options (e.g. `interval=10.0`).
    pub options: Vec<String>,
}

// =============================================================================
// Ports
// =============================================================================

/// Handler invoked by the adapter for every asynchronous event.
///
/// Called on a delivery thread the adapter controls; implementations must
/// not block on consumer-held locks longer than a critical section.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// One open session with the external collaborator.
pub trait Session: Send {
    /// Start the session.
    ///
    /// # Errors
    ///
    /// `StartFailed` when the endpoint cannot be reached.
    fn start(&mut self) -> Result<(), SessionError>;

    /// Open a service on the started session.
    ///
    /// # Errors
    ///
    /// `OpenFailed` when the service is unavailable.
    fn open_service(&mut self, service: ServiceKind) -> Result<(), SessionError>;

    /// Submit a reference data request.
    ///
    /// # Errors
    ///
    /// `Closed` when the session is no longer usable.
    fn send_request(
        &mut self,
        service: ServiceKind,
        request: &ReferenceRequest,
        correlation: &Correlation,
    ) -> Result<(), SessionError>;

    /// Block up to `timeout` for the next event.
    ///
    /// # Errors
    ///
    /// `Timeout` when nothing arrived in time; `Closed` when the session
    /// can deliver nothing further.
    fn next_event(&mut self, timeout: Duration) -> Result<Event, SessionError>;

    /// Subscribe to streaming data for every entry.
    ///
    /// # Errors
    ///
    /// `Closed` when the session is no longer usable.
    fn subscribe(&mut self, entries: &[SubscriptionEntry]) -> Result<(), SessionError>;

    /// Replace the active subscription list with `entries`.
    ///
    /// # Errors
    ///
    /// `Closed` when the session is no longer usable.
    fn resubscribe(&mut self, entries: &[SubscriptionEntry]) -> Result<(), SessionError>;

    /// Stop the session and release its resources.
    ///
    /// # Errors
    ///
    /// Adapter-specific; stopping an already-stopped session is not an
    /// error.
    fn stop(&mut self) -> Result<(), SessionError>;
}

/// Opens sessions.
pub trait SessionFactory: Send + Sync {
    /// Create a session from `options`.
    ///
    /// When `handler` is given, the adapter invokes it on its delivery
    /// thread(s) for every asynchronous event; otherwise events queue for
    /// [`Session::next_event`].
    ///
    /// # Errors
    ///
    /// `Exhausted` when the adapter cannot allocate a session.
    fn create(
        &self,
        options: &SessionOptions,
        handler: Option<EventHandler>,
    ) -> Result<Box<dyn Session>, SessionError>;
}
