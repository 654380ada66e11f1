//! Subscription - Ticker Registry for Streaming Updates
//!
//! A `Subscription` owns the securities it streams into, keyed by ticker
//! (case-insensitive, ticker-ordered), plus the update interval and the
//! irreversible terminated flag. The asynchronous event router creates
//! securities lazily through [`Subscription::create_security_if_none`];
//! consumers poll security state at their own cadence.
//!
//! # Locking
//!
//! Registry state and the live stream handle sit behind separate locks.
//! Registry mutation never calls into the session, and session calls
//! never hold the registry lock, so the delivery thread folding ticks is
//! never blocked behind a consumer resubscribing.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::application::ports::events::Correlation;
use crate::application::ports::{Session, SessionError, SubscriptionEntry};
use crate::domain::security::Security;

/// Default update interval, seconds.
const DEFAULT_INTERVAL_SECS: f64 = 10.0;

// =============================================================================
// Errors
// =============================================================================

/// Failures from subscription management calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// `modify` was called before `market_data` attached a stream.
    #[error("no active stream to modify")]
    NoStream,

    /// The underlying session refused the call.
    #[error(transparent)]
    Session(#[from] SessionError),
}

// =============================================================================
// Subscription
// =============================================================================

struct RegistryEntry {
    ticker: Arc<str>,
    security: Arc<Security>,
}

struct State {
    interval: f64,
    terminated: bool,
    securities: BTreeMap<String, RegistryEntry>,
}

struct ActiveStream {
    session: Box<dyn Session>,
}

/// Ticker-ordered registry of securities receiving streaming updates.
///
/// Thread-safe; share behind an `Arc` so the event router can resolve
/// targets from the delivery thread while consumers read.
pub struct Subscription {
    state: Mutex<State>,
    stream: Mutex<Option<ActiveStream>>,
}

fn canon(ticker: &str) -> String {
    ticker.to_ascii_uppercase()
}

impl Subscription {
    /// Create an empty subscription with the default interval.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                interval: DEFAULT_INTERVAL_SECS,
                terminated: false,
                securities: BTreeMap::new(),
            }),
            stream: Mutex::new(None),
        }
    }

    // -------------------------------------------------------------------------
    // Scalar state
    // -------------------------------------------------------------------------

    /// Update interval in seconds.
    #[must_use]
    pub fn interval(&self) -> f64 {
        self.state.lock().interval
    }

    /// Set the update interval used by subsequent subscribe calls.
    pub fn set_interval(&self, interval: f64) {
        self.state.lock().interval = interval;
    }

    /// Whether the session reported termination.
    ///
    /// Once true the subscription is dead: callers must discard it rather
    /// than mutate further.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Flip the terminated flag. Called by the event router on a
    /// session-termination status; irreversible.
    pub(crate) fn mark_terminated(&self) {
        self.state.lock().terminated = true;
    }

    // -------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------

    /// Whether `ticker` is registered (case-insensitive).
    #[must_use]
    pub fn has_security(&self, ticker: &str) -> bool {
        self.state.lock().securities.contains_key(&canon(ticker))
    }

    /// Number of registered securities.
    #[must_use]
    pub fn security_count(&self) -> usize {
        self.state.lock().securities.len()
    }

    /// The security registered under `ticker`, if any.
    #[must_use]
    pub fn security(&self, ticker: &str) -> Option<Arc<Security>> {
        let state = self.state.lock();
        state
            .securities
            .get(&canon(ticker))
            .map(|entry| Arc::clone(&entry.security))
    }

    /// Registered tickers in ticker order.
    #[must_use]
    pub fn tickers(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .securities
            .values()
            .map(|entry| entry.ticker.to_string())
            .collect()
    }

    /// Snapshot iterator over the registered securities, ticker-ordered.
    ///
    /// Independent of later registry changes; any number of iterations
    /// can run concurrently.
    #[must_use]
    pub fn securities(&self) -> Securities {
        let state = self.state.lock();
        let snapshot: Vec<Arc<Security>> = state
            .securities
            .values()
            .map(|entry| Arc::clone(&entry.security))
            .collect();
        Securities {
            securities: snapshot.into_iter(),
        }
    }

    /// Return the security for `ticker`, creating and registering it when
    /// absent.
    ///
    /// Idempotent: the same `Arc` comes back for the same ticker. This is
    /// the sole creation path used by the event router and is safe to
    /// call from the delivery thread while consumers read other tickers.
    pub fn create_security_if_none(&self, ticker: &str) -> Arc<Security> {
        let mut state = self.state.lock();
        let entry = state
            .securities
            .entry(canon(ticker))
            .or_insert_with(|| RegistryEntry {
                ticker: Arc::from(ticker),
                security: Arc::new(Security::with_ticker(ticker)),
            });
        Arc::clone(&entry.security)
    }

    // -------------------------------------------------------------------------
    // Stream control
    // -------------------------------------------------------------------------

    /// Hand the live session to this subscription after a successful
    /// subscribe.
    pub(crate) fn attach_stream(&self, session: Box<dyn Session>) {
        *self.stream.lock() = Some(ActiveStream { session });
    }

    /// Replace the streamed ticker set.
    ///
    /// A full resync: registered tickers absent from `tickers` are
    /// removed (their securities dropped), then one wire-level
    /// resubscribe lists the complete desired set. Securities for newly
    /// added tickers appear lazily, on their first routed event.
    ///
    /// # Errors
    ///
    /// `NoStream` before `market_data` attached a stream; `Terminated`
    /// after the session reported termination; adapter errors pass
    /// through.
    pub fn modify(&self, tickers: &[&str], fields: &[&str]) -> Result<(), SubscriptionError> {
        let entries = {
            let mut state = self.state.lock();
            if state.terminated {
                return Err(SessionError::Terminated.into());
            }

            let keep: Vec<String> = tickers.iter().map(|t| canon(t)).collect();
            let before = state.securities.len();
            state.securities.retain(|key, _| keep.contains(key));
            let dropped = before - state.securities.len();
            if dropped > 0 {
                debug!(dropped, "pruned securities absent from new ticker set");
            }

            let interval = state.interval;
            build_entries(tickers, fields, interval)
        };

        // Session call happens outside the registry lock.
        let mut stream = self.stream.lock();
        let Some(active) = stream.as_mut() else {
            return Err(SubscriptionError::NoStream);
        };
        active.session.resubscribe(&entries)?;
        Ok(())
    }

    /// Stop streaming and release the session. Idempotent.
    ///
    /// # Errors
    ///
    /// Adapter errors from stopping pass through; ending an already-ended
    /// subscription is `Ok`.
    pub fn end(&self) -> Result<(), SessionError> {
        let taken = self.stream.lock().take();
        if let Some(mut active) = taken {
            active.session.stop()?;
        }
        Ok(())
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Best effort; the adapter may already be gone.
        let _ = self.end();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Subscription")
            .field("interval", &state.interval)
            .field("terminated", &state.terminated)
            .field("securities", &state.securities.len())
            .finish_non_exhaustive()
    }
}

/// Build one wire entry per desired ticker, correlation keyed by ticker.
pub(crate) fn build_entries(
    tickers: &[&str],
    fields: &[&str],
    interval: f64,
) -> Vec<SubscriptionEntry> {
    let fields: Vec<String> = fields.iter().map(|&f| f.to_owned()).collect();
    let options = vec![format!("interval={interval:.1}")];

    tickers
        .iter()
        .map(|&ticker| {
            let ticker: Arc<str> = Arc::from(ticker);
            SubscriptionEntry {
                correlation: Correlation::Ticker(Arc::clone(&ticker)),
                ticker,
                fields: fields.clone(),
                options: options.clone(),
            }
        })
        .collect()
}

/// Caller-owned snapshot iterator over registered securities.
pub struct Securities {
    securities: std::vec::IntoIter<Arc<Security>>,
}

impl Iterator for Securities {
    type Item = Arc<Security>;

    fn next(&mut self) -> Option<Arc<Security>> {
        self.securities.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.securities.size_hint()
    }
}

impl ExactSizeIterator for Securities {}

// =============================================================================
// Tests
// =============================================================================
