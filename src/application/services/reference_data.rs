//! Reference Data Protocol Driver
//!
//! Drives one synchronous reference data request to completion: builds
//! the request from the target security's pending overrides, submits it,
//! then drains the session's event stream until the terminal response,
//! folding every leaf field element into the security.
//!
//! The drive is a small state machine:
//!
//! ```text
//! Requesting ──start/open/send──► AwaitingResponse ──final response──► Done
//!     │                                │
//!     └──────────► Failed ◄────────────┘ (session error)
//! ```
//!
//! Partial responses fold data and stay in `AwaitingResponse`. Events of
//! any other kind are inspected for diagnostics but change nothing. A
//! security-level error element aborts that security's fields only; the
//! exchange carries on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::application::ports::events::{Correlation, Event, EventKind};
use crate::application::ports::{
    ReferenceRequest, ServiceKind, Session, SessionError, SessionFactory, SessionOptions,
};
use crate::domain::security::Security;

/// Bound on each event poll while draining a response.
pub(crate) const EVENT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Correlation ids for request/response exchanges.
static NEXT_CORRELATION: AtomicU64 = AtomicU64::new(1);

fn next_correlation() -> Correlation {
    Correlation::Id(NEXT_CORRELATION.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveState {
    Requesting,
    AwaitingResponse,
    Done,
    Failed,
}

/// Run one reference data exchange into `security`.
///
/// Consumes the security's pending overrides (snapshot then clear) and
/// reads no events after the terminal response.
pub(crate) fn drive(
    factory: &dyn SessionFactory,
    options: &SessionOptions,
    security: &Security,
    ticker: &str,
    fields: &[&str],
) -> Result<(), SessionError> {
    let mut state = DriveState::Requesting;
    trace!(?state, ticker, "reference data drive starting");

    let mut session = match setup(factory, options) {
        Ok(session) => session,
        Err(error) => {
            state = DriveState::Failed;
            debug!(?state, %error, "reference data drive failed before request");
            return Err(error);
        }
    };

    let request = ReferenceRequest {
        ticker: ticker.to_owned(),
        fields: fields.iter().map(|&f| f.to_owned()).collect(),
        overrides: security.take_overrides(),
    };
    debug!(
        ticker,
        fields = request.fields.len(),
        overrides = request.overrides.len(),
        "submitting reference data request"
    );

    if let Err(error) = session.send_request(ServiceKind::ReferenceData, &request, &next_correlation()) {
        state = DriveState::Failed;
        debug!(?state, %error, "request submission failed");
        return Err(error);
    }

    state = DriveState::AwaitingResponse;
    trace!(?state, "draining events");

    loop {
        let event = match session.next_event(EVENT_POLL_TIMEOUT) {
            Ok(event) => event,
            Err(SessionError::Timeout) => {
                trace!("event poll timed out, polling again");
                continue;
            }
            Err(error) => {
                state = DriveState::Failed;
                debug!(?state, %error, "event drain aborted");
                let _ = session.stop();
                return Err(error);
            }
        };

        match event.kind {
            EventKind::PartialResponse => {
                fold_response(security, &event);
            }
            EventKind::Response => {
                fold_response(security, &event);
                state = DriveState::Done;
                trace!(?state, "terminal response observed");
                break;
            }
            _ => inspect_other(&event),
        }
    }

    if let Err(error) = session.stop() {
        debug!(%error, "session stop after completed drive failed");
    }
    Ok(())
}

fn setup(
    factory: &dyn SessionFactory,
    options: &SessionOptions,
) -> Result<Box<dyn Session>, SessionError> {
    let mut session = factory.create(options, None)?;
    session.start()?;
    session.open_service(ServiceKind::ReferenceData)?;
    Ok(session)
}

/// Fold every security data item of a (partial or final) response.
pub(crate) fn fold_response(security: &Security, event: &Event) {
    for message in &event.messages {
        let body = &message.body;

        // A request that cannot be completed at all comes back with a
        // response-level error element; the details matter only for
        // diagnostics.
        if let Some(error) = body.child("responseError") {
            warn!(detail = %error.to_json(), "response carried responseError");
        }

        let Some(security_data) = body.child("securityData") else {
            continue;
        };

        for item in security_data.children() {
            if let Some(name) = item.child_value("security") {
                security.set_ticker(name);
            }

            if let Some(sequence) = item.child_value("sequenceNumber") {
                trace!(sequence, "security data item");
            }

            // A per-security error aborts this security's fields only.
            if let Some(error) = item.child("securityError") {
                warn!(
                    ticker = item.child_value("security").unwrap_or(""),
                    detail = %error.to_json(),
                    "skipping security with securityError"
                );
                continue;
            }

            let Some(field_data) = item.child("fieldData") else {
                continue;
            };

            for field in field_data.children() {
                if field.is_sequence() {
                    // Bulk data stays opaque; surfaced for diagnostics only.
                    debug!(field = field.name(), detail = %field.to_json(), "bulk field");
                    continue;
                }

                let Some(value) = field.scalar_value() else {
                    continue;
                };

                security.ingest(field.name(), value);
                debug!(field = field.name(), value, "folded field");
            }
        }
    }
}

/// Log events other than partial/final responses.
fn inspect_other(event: &Event) {
    for message in &event.messages {
        debug!(
            kind = ?event.kind,
            message_type = %message.message_type,
            "ignoring non-response event message"
        );
        trace!(body = %message.body.to_json(), "non-response message body");
    }
}

// =============================================================================
// Tests
// =============================================================================
