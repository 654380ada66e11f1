#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access
    )
)]

//! mktlink - Typed Market Data Cache
//!
//! A client-side cache and event-demultiplexing layer between an
//! asynchronous market-data/reference-data session API and application
//! code. Loosely-typed wire values (strings) become typed fields indexed
//! per instrument; synchronous request/response cycles and asynchronous
//! push events both land in the same per-instrument store.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: The typed store and its registries
//!   - `value`: tagged field values with lenient numeric conversion
//!   - `catalog`: compiled-in mnemonic → kind/description table
//!   - `security`: per-instrument field store + request overrides
//!   - `subscription`: ticker registry for streaming updates
//!
//! - **Application**: Exchange drivers and port definitions
//!   - `ports`: session traits and the event/element model
//!   - `services`: reference data driver, market data router
//!   - `client`: session-options holder and entry point
//!
//! - **Infrastructure**: Adapters and integrations
//!   - `session`: loopback session for tests and simulation
//!   - `config`: env-driven session options
//!   - `telemetry`: tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//!                  ┌─────────────┐     ┌──────────────┐
//! request ────────►│  Reference  │────►│              │
//!                  │   Driver    │     │   Security   │◄── typed reads
//!                  └─────────────┘     │ (per ticker) │
//! push events ────►┌─────────────┐────►│              │
//!  (delivery       │    Event    │     └──────────────┘
//!   thread)        │   Router    │── correlation ticker ──► Subscription
//!                  └─────────────┘
//! ```
//!
//! # Concurrency
//!
//! The session delivers events on threads it controls; this crate
//! creates none. Each `Security` and `Subscription` guards its state
//! with its own lock, held only for the critical section and never
//! across a session call.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - the typed store and its registries.
pub mod domain;

/// Application layer - exchange drivers and port definitions.
pub mod application;

/// Infrastructure layer - adapters and integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::catalog::{self, FieldDescriptor};
pub use domain::security::{FieldNames, Override, Security, SecurityError};
pub use domain::subscription::{Securities, Subscription, SubscriptionError};
pub use domain::value::{FieldKind, FieldValue, Handle};

// Client handle
pub use application::client::{Client, ClientError};

// Session ports (for adapter implementations and integration tests)
pub use application::ports::{
    EventHandler, ReferenceRequest, ServiceKind, Session, SessionError, SessionFactory,
    SessionOptions, SubscriptionEntry,
    events::{Correlation, Element, ElementValue, Event, EventKind, Message},
};

// Loopback adapter (for integration tests and simulation)
pub use infrastructure::session::{LoopbackFactory, LoopbackFeed, WireCall};
