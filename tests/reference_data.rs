//! Reference Data Exchange Integration Tests
//!
//! Drives the synchronous reference data cycle end to end against the
//! loopback session: request build, override consumption, partial/final
//! folding, per-security error absorption, and the failure paths.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::sync::Arc;
use std::time::Duration;

use mktlink::{
    Client, ClientError, Correlation, Element, Event, EventKind, LoopbackFactory, Message,
    Security, Session as _, SessionError, SessionFactory, SessionOptions, WireCall,
};

fn client_over(factory: &Arc<LoopbackFactory>) -> Client {
    let factory: Arc<dyn SessionFactory> = factory.clone();
    Client::new(factory, SessionOptions::default())
}

fn security_item(ticker: &str, fields: Vec<Element>) -> Element {
    Element::group(
        "securityData",
        vec![
            Element::scalar("security", ticker),
            Element::scalar("sequenceNumber", "0"),
            Element::group("fieldData", fields),
        ],
    )
}

fn response_event(kind: EventKind, items: Vec<Element>) -> Event {
    Event::new(
        kind,
        vec![Message::new(
            "ReferenceDataResponse",
            Correlation::Id(1),
            Element::group(
                "ReferenceDataResponse",
                vec![Element::sequence("securityData", items)],
            ),
        )],
    )
}

// =============================================================================
// Happy Path
// =============================================================================

#[test]
fn partial_then_final_yields_the_union_of_fields() {
    let factory = Arc::new(LoopbackFactory::new());
    let feed = factory.feed();
    let client = client_over(&factory);
    let security = Security::new();

    feed.push(response_event(
        EventKind::PartialResponse,
        vec![security_item(
            "IBM US Equity",
            vec![
                Element::scalar("PX_LAST", "101.25"),
                Element::scalar("NAME", "INTL BUSINESS MACHINES"),
            ],
        )],
    ));
    feed.push(response_event(
        EventKind::Response,
        vec![security_item(
            "IBM US Equity",
            vec![
                Element::scalar("PX_BID", "101.20"),
                Element::scalar("VOLUME", "4200000"),
            ],
        )],
    ));

    client
        .reference_data(&security, "IBM US Equity", &["PX_LAST", "NAME", "PX_BID", "VOLUME"])
        .unwrap();

    assert_eq!(security.ticker().as_deref(), Some("IBM US Equity"));
    assert_eq!(security.decimal("PX_LAST"), Some(101.25));
    assert_eq!(security.decimal("PX_BID"), Some(101.20));
    assert_eq!(security.unsigned("VOLUME"), Some(4_200_000));
    assert_eq!(
        security.text("NAME").as_deref(),
        Some("INTL BUSINESS MACHINES")
    );
    assert_eq!(security.field_count(), 4);
    assert_eq!(client.last_error_code(), 0);
}

#[test]
fn driver_stops_at_the_terminal_response() {
    let factory = Arc::new(LoopbackFactory::new());
    let feed = factory.feed();
    let client = client_over(&factory);
    let security = Security::new();

    feed.push(response_event(
        EventKind::Response,
        vec![security_item(
            "IBM US Equity",
            vec![Element::scalar("PX_LAST", "100.0")],
        )],
    ));
    // Queued after the final response; a well-behaved driver never reads it.
    feed.push(response_event(
        EventKind::PartialResponse,
        vec![security_item(
            "IBM US Equity",
            vec![Element::scalar("PX_LAST", "999.0")],
        )],
    ));

    client
        .reference_data(&security, "IBM US Equity", &["PX_LAST"])
        .unwrap();
    assert_eq!(security.decimal("PX_LAST"), Some(100.0));

    // The late event is still sitting in the shared queue.
    let mut probe = factory
        .create(&SessionOptions::default(), None)
        .unwrap();
    probe.start().unwrap();
    let leftover = probe.next_event(Duration::from_millis(100)).unwrap();
    assert_eq!(leftover.kind, EventKind::PartialResponse);
}

#[test]
fn non_response_events_are_skipped_while_draining() {
    let factory = Arc::new(LoopbackFactory::new());
    let feed = factory.feed();
    let client = client_over(&factory);
    let security = Security::new();

    feed.push(Event::new(
        EventKind::SessionStatus,
        vec![Message::new(
            "SessionStarted",
            Correlation::None,
            Element::group("SessionStarted", vec![]),
        )],
    ));
    feed.push(response_event(
        EventKind::Response,
        vec![security_item(
            "IBM US Equity",
            vec![Element::scalar("PX_LAST", "100.0")],
        )],
    ));

    client
        .reference_data(&security, "IBM US Equity", &["PX_LAST"])
        .unwrap();
    assert_eq!(security.decimal("PX_LAST"), Some(100.0));
}

#[test]
fn unparsable_numeric_lands_as_zero_but_present() {
    let factory = Arc::new(LoopbackFactory::new());
    let feed = factory.feed();
    let client = client_over(&factory);
    let security = Security::new();

    feed.push(response_event(
        EventKind::Response,
        vec![security_item(
            "IBM US Equity",
            vec![Element::scalar("PX_LAST", "not-a-number")],
        )],
    ));

    client
        .reference_data(&security, "IBM US Equity", &["PX_LAST"])
        .unwrap();

    assert!(security.has_field("PX_LAST"));
    assert_eq!(security.decimal("PX_LAST"), Some(0.0));
}

// =============================================================================
// Overrides
// =============================================================================

#[test]
fn overrides_ride_the_request_and_are_consumed() {
    let factory = Arc::new(LoopbackFactory::new());
    let feed = factory.feed();
    let client = client_over(&factory);
    let security = Security::new();

    security.add_override("VWAP_START_TIME", "9:30");
    security.add_override("EQY_FUND_CRNCY", "JPY");
    assert!(security.has_override("EQY_FUND_CRNCY"));

    feed.push(response_event(
        EventKind::Response,
        vec![security_item(
            "IBM US Equity",
            vec![Element::scalar("PX_LAST", "100.0")],
        )],
    ));

    client
        .reference_data(&security, "IBM US Equity", &["PX_LAST"])
        .unwrap();

    // Consumed by the request, cleared after.
    assert!(!security.has_override("EQY_FUND_CRNCY"));
    assert!(!security.has_override("VWAP_START_TIME"));

    let calls = factory.calls();
    let WireCall::Request(request) = &calls[0] else {
        panic!("expected a request, got {calls:?}");
    };
    let ids: Vec<_> = request
        .overrides
        .iter()
        .map(|o| o.field_id.as_str())
        .collect();
    assert_eq!(ids, vec!["EQY_FUND_CRNCY", "VWAP_START_TIME"]);
    assert_eq!(request.ticker, "IBM US Equity");
    assert_eq!(request.fields, vec!["PX_LAST"]);
}

// =============================================================================
// Per-Security Errors
// =============================================================================

#[test]
fn security_error_skips_that_security_only() {
    let factory = Arc::new(LoopbackFactory::new());
    let feed = factory.feed();
    let client = client_over(&factory);
    let security = Security::new();

    feed.push(response_event(
        EventKind::PartialResponse,
        vec![security_item(
            "IBM US Equity",
            vec![Element::scalar("PX_LAST", "101.25")],
        )],
    ));

    let error_item = Element::group(
        "securityData",
        vec![
            Element::scalar("security", "NOPE US Equity"),
            Element::group(
                "securityError",
                vec![Element::scalar("message", "Unknown/Invalid Security")],
            ),
        ],
    );
    feed.push(response_event(
        EventKind::Response,
        vec![
            security_item(
                "IBM US Equity",
                vec![Element::scalar("PX_BID", "101.20")],
            ),
            error_item,
        ],
    ));

    client
        .reference_data(&security, "IBM US Equity", &["PX_LAST", "PX_BID"])
        .unwrap();

    // Union of both responses; the error item contributed nothing fatal.
    assert_eq!(security.decimal("PX_LAST"), Some(101.25));
    assert_eq!(security.decimal("PX_BID"), Some(101.20));
}

// =============================================================================
// Failure Paths
// =============================================================================

#[test]
fn start_failure_is_recorded_and_consumes_nothing() {
    let factory = Arc::new(LoopbackFactory::new());
    let feed = factory.feed();
    let client = client_over(&factory);
    let security = Security::new();

    feed.push(response_event(EventKind::Response, vec![]));
    factory.fail_start(true);

    let err = client
        .reference_data(&security, "IBM US Equity", &["PX_LAST"])
        .unwrap_err();
    assert_eq!(err, ClientError::Session(SessionError::StartFailed));
    assert_eq!(client.last_error_code(), 1);
    assert_eq!(
        client.last_error_message().as_deref(),
        Some("failed to start session")
    );

    // No request went out and the scripted event was never consumed.
    assert!(factory.calls().is_empty());
    factory.fail_start(false);
    let mut probe = factory.create(&SessionOptions::default(), None).unwrap();
    probe.start().unwrap();
    assert!(probe.next_event(Duration::from_millis(100)).is_ok());
}

#[test]
fn open_failure_maps_to_its_own_code() {
    let factory = Arc::new(LoopbackFactory::new());
    let client = client_over(&factory);
    let security = Security::new();

    factory.fail_open(true);

    let err = client
        .reference_data(&security, "IBM US Equity", &["PX_LAST"])
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Session(SessionError::OpenFailed(_))
    ));
    assert_eq!(client.last_error_code(), 2);
}

#[test]
fn a_successful_call_clears_the_last_error() {
    let factory = Arc::new(LoopbackFactory::new());
    let feed = factory.feed();
    let client = client_over(&factory);
    let security = Security::new();

    factory.fail_start(true);
    let _ = client.reference_data(&security, "IBM US Equity", &["PX_LAST"]);
    assert_eq!(client.last_error_code(), 1);

    factory.fail_start(false);
    feed.push(response_event(
        EventKind::Response,
        vec![security_item(
            "IBM US Equity",
            vec![Element::scalar("PX_LAST", "100.0")],
        )],
    ));
    client
        .reference_data(&security, "IBM US Equity", &["PX_LAST"])
        .unwrap();

    assert_eq!(client.last_error_code(), 0);
    assert!(client.last_error().is_none());
}
