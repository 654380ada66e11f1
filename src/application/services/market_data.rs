//! Market Data Event Router
//!
//! Starts a subscription's streaming updates and routes every
//! asynchronous push event to the right security. Routing is stateless:
//! each streaming message carries its ticker in the correlation payload,
//! so dispatch is a registry lookup (creating the security on the first
//! event for an unseen ticker) followed by the same leaf-folding rule the
//! reference data driver uses.
//!
//! Status handling is separate: a `SessionTerminated` status flips the
//! subscription's terminated flag and stops inspection of that event's
//! remaining messages.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::application::ports::events::{
    Event, EventKind, MARKET_DATA_EVENTS, Message, SESSION_TERMINATED,
};
use crate::application::ports::{
    EventHandler, ServiceKind, Session as _, SessionError, SessionFactory, SessionOptions,
};
use crate::domain::subscription::{Subscription, build_entries};

/// Open a session, subscribe the full ticker set, and wire the router as
/// the session's event handler.
///
/// The handler holds the subscription weakly: dropping the subscription
/// stops routing without keeping the registry alive from the adapter
/// side.
pub(crate) fn start_stream(
    factory: &dyn SessionFactory,
    options: &SessionOptions,
    subscription: &Arc<Subscription>,
    tickers: &[&str],
    fields: &[&str],
) -> Result<(), SessionError> {
    let handler: EventHandler = {
        let subscription = Arc::downgrade(subscription);
        Arc::new(move |event: &Event| {
            if let Some(subscription) = subscription.upgrade() {
                route_event(&subscription, event);
            }
        })
    };

    let mut session = factory.create(options, Some(handler))?;
    session.start()?;
    session.open_service(ServiceKind::MarketData)?;

    let entries = build_entries(tickers, fields, subscription.interval());
    debug!(
        tickers = entries.len(),
        fields = fields.len(),
        "subscribing to streaming market data"
    );
    session.subscribe(&entries)?;

    subscription.attach_stream(session);
    Ok(())
}

/// Dispatch one delivered event. Runs on the adapter's delivery thread.
pub(crate) fn route_event(subscription: &Subscription, event: &Event) {
    match event.kind {
        EventKind::SubscriptionData | EventKind::SubscriptionStatus => {
            for message in &event.messages {
                handle_data_message(subscription, message);
            }
        }
        _ => handle_status(subscription, event),
    }
}

fn handle_data_message(subscription: &Subscription, message: &Message) {
    let Some(ticker) = message.correlation.ticker() else {
        trace!(
            message_type = %message.message_type,
            "streaming message without ticker correlation"
        );
        return;
    };

    let security = subscription.create_security_if_none(ticker);

    if message.body.name() != MARKET_DATA_EVENTS {
        // Other envelopes (e.g. subscription started/failed notices) are
        // not tick data; ignoring them is not an error.
        trace!(envelope = message.body.name(), ticker, "ignoring envelope");
        return;
    }

    for field in message.body.children() {
        if field.is_sequence() {
            debug!(field = field.name(), detail = %field.to_json(), "bulk field");
            continue;
        }

        let Some(value) = field.scalar_value() else {
            continue;
        };

        security.ingest(field.name(), value);
        trace!(ticker, field = field.name(), value, "folded tick field");
    }
}

fn handle_status(subscription: &Subscription, event: &Event) {
    for message in &event.messages {
        debug!(
            kind = ?event.kind,
            message_type = %message.message_type,
            "status message"
        );

        if event.kind == EventKind::SessionStatus
            && message.message_type == SESSION_TERMINATED
        {
            info!("session terminated; discarding subscription");
            subscription.mark_terminated();
            break;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
