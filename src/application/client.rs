//! Client Handle
//!
//! The process-facing entry point: holds the session options and factory,
//! records the last session-level failure as a code/message pair, and
//! exposes the two exchange styles: a synchronous reference data fetch
//! into one [`Security`] and the start of a subscription's streaming
//! updates.
//!
//! Session failures are recorded here and returned as errors; they are
//! never panics. Callers check the result of every call; nothing retries
//! automatically.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::application::ports::{SessionError, SessionFactory, SessionOptions};
use crate::application::services::{market_data, reference_data};
use crate::domain::security::Security;
use crate::domain::subscription::Subscription;

// =============================================================================
// Errors
// =============================================================================

/// Failures surfaced to application code by [`Client`] calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The session collaborator refused or lost the exchange.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// Stable numeric code for the failure.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Session(SessionError::StartFailed) => 1,
            Self::Session(SessionError::OpenFailed(_)) => 2,
            Self::Session(SessionError::Exhausted) => 4,
            Self::Session(SessionError::Timeout) => 5,
            Self::Session(SessionError::Terminated) => 6,
            Self::Session(SessionError::Closed) => 7,
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Session-options holder and exchange entry point.
///
/// Thread-safe; clone the `Arc` it usually lives in rather than the
/// client itself.
pub struct Client {
    factory: Arc<dyn SessionFactory>,
    options: SessionOptions,
    last_error: Mutex<Option<ClientError>>,
}

impl Client {
    /// Create a client over `factory` with explicit options.
    #[must_use]
    pub fn new(factory: Arc<dyn SessionFactory>, options: SessionOptions) -> Self {
        Self {
            factory,
            options,
            last_error: Mutex::new(None),
        }
    }

    /// Session options used for every exchange.
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The most recent failure, if the last call failed.
    #[must_use]
    pub fn last_error(&self) -> Option<ClientError> {
        self.last_error.lock().clone()
    }

    /// Numeric code of the most recent failure; `0` when the last call
    /// succeeded.
    #[must_use]
    pub fn last_error_code(&self) -> u16 {
        self.last_error.lock().as_ref().map_or(0, ClientError::code)
    }

    /// Message of the most recent failure, if any.
    #[must_use]
    pub fn last_error_message(&self) -> Option<String> {
        self.last_error.lock().as_ref().map(ToString::to_string)
    }

    /// Fetch reference data for `ticker` into `security`.
    ///
    /// Blocks until the terminal response, folding partial and final
    /// responses into the security. Pending overrides on the security are
    /// consumed by this request.
    ///
    /// # Errors
    ///
    /// Start/open/submission failures, recorded as the last error; no
    /// events are consumed on a setup failure.
    pub fn reference_data(
        &self,
        security: &Security,
        ticker: &str,
        fields: &[&str],
    ) -> Result<(), ClientError> {
        let result = reference_data::drive(
            self.factory.as_ref(),
            &self.options,
            security,
            ticker,
            fields,
        );
        self.record(result)
    }

    /// Start streaming updates for `tickers` into `subscription`.
    ///
    /// Returns once the subscription is issued; data then flows on the
    /// session's delivery thread(s) until [`Subscription::end`] or
    /// session termination.
    ///
    /// # Errors
    ///
    /// Start/open/subscribe failures, recorded as the last error.
    pub fn market_data(
        &self,
        subscription: &Arc<Subscription>,
        tickers: &[&str],
        fields: &[&str],
    ) -> Result<(), ClientError> {
        let result = market_data::start_stream(
            self.factory.as_ref(),
            &self.options,
            subscription,
            tickers,
            fields,
        );
        self.record(result)
    }

    fn record(&self, result: Result<(), SessionError>) -> Result<(), ClientError> {
        match result {
            Ok(()) => {
                *self.last_error.lock() = None;
                Ok(())
            }
            Err(error) => {
                let error = ClientError::from(error);
                *self.last_error.lock() = Some(error.clone());
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("last_error", &*self.last_error.lock())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
