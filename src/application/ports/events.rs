//! Session Event Model
//!
//! Wire-shape types for events delivered by the session collaborator.
//! An event carries one or more messages; each message carries a typed
//! correlation payload and a tree of named elements whose leaves hold
//! string-form values.
//!
//! # Correlation
//!
//! The correlation payload is typed. A streaming subscription tags its
//! correlation with the ticker (`Correlation::Ticker`), shared via
//! `Arc<str>` so the string outlives every in-flight event referencing
//! it. Request/response exchanges use a plain numeric id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

// =============================================================================
// Well-Known Names
// =============================================================================

/// Envelope name of streaming tick messages.
pub const MARKET_DATA_EVENTS: &str = "MarketDataEvents";

/// Message type of the session-level termination status.
pub const SESSION_TERMINATED: &str = "SessionTerminated";

/// Envelope name of reference data responses.
pub const REFERENCE_DATA_RESPONSE: &str = "ReferenceDataResponse";

// =============================================================================
// Correlation
// =============================================================================

/// Typed correlation payload attached to requests and echoed on events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// No correlation attached.
    None,
    /// Numeric id, used for request/response exchanges.
    Id(u64),
    /// Ticker routing key, used for streaming subscriptions.
    Ticker(Arc<str>),
}

impl Correlation {
    /// Ticker payload, when this correlation routes by ticker.
    #[must_use]
    pub fn ticker(&self) -> Option<&str> {
        match self {
            Self::Ticker(t) => Some(t),
            _ => None,
        }
    }

    /// Numeric id payload, when present.
    #[must_use]
    pub const fn id(&self) -> Option<u64> {
        match self {
            Self::Id(id) => Some(*id),
            _ => None,
        }
    }
}

// =============================================================================
// Element Tree
// =============================================================================

/// Payload of one element tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementValue {
    /// Leaf with an optional string-form value.
    Scalar(Option<String>),
    /// Named child elements.
    Group(Vec<Element>),
    /// Repeated ("bulk") child elements.
    Sequence(Vec<Element>),
}

/// A named node in a message's element tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    name: String,
    value: ElementValue,
}

impl Element {
    /// Leaf element carrying a value.
    #[must_use]
    pub fn scalar(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: ElementValue::Scalar(Some(value.to_owned())),
        }
    }

    /// Leaf element with no value.
    #[must_use]
    pub fn empty_scalar(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: ElementValue::Scalar(None),
        }
    }

    /// Element with named children.
    #[must_use]
    pub fn group(name: &str, children: Vec<Self>) -> Self {
        Self {
            name: name.to_owned(),
            value: ElementValue::Group(children),
        }
    }

    /// Element with repeated children (bulk data).
    #[must_use]
    pub fn sequence(name: &str, items: Vec<Self>) -> Self {
        Self {
            name: name.to_owned(),
            value: ElementValue::Sequence(items),
        }
    }

    /// Node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this node is a leaf.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self.value, ElementValue::Scalar(_))
    }

    /// Whether this node holds repeated (bulk) children.
    #[must_use]
    pub const fn is_sequence(&self) -> bool {
        matches!(self.value, ElementValue::Sequence(_))
    }

    /// Leaf value, when present.
    #[must_use]
    pub fn scalar_value(&self) -> Option<&str> {
        match &self.value {
            ElementValue::Scalar(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Child elements; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.value {
            ElementValue::Scalar(_) => &[],
            ElementValue::Group(children) | ElementValue::Sequence(children) => children,
        }
    }

    /// First child named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Whether a child named `name` exists.
    #[must_use]
    pub fn has_element(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Scalar value of the child named `name`, when present.
    #[must_use]
    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Self::scalar_value)
    }

    /// JSON rendering for diagnostics.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("<element {}>", self.name))
    }
}

// =============================================================================
// Messages and Events
// =============================================================================

/// Kind of a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Part of a response; more response events follow.
    PartialResponse,
    /// Terminal response; no further events for the request.
    Response,
    /// Streaming tick data.
    SubscriptionData,
    /// Streaming subscription status change.
    SubscriptionStatus,
    /// Session-level status change.
    SessionStatus,
    /// Service-level status change.
    ServiceStatus,
    /// Administrative event.
    Admin,
}

/// One message within an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Message type name (e.g. `SessionTerminated`).
    pub message_type: String,
    /// Correlation payload echoed from the originating request.
    pub correlation: Correlation,
    /// Root of the element tree.
    pub body: Element,
}

impl Message {
    /// Build a message.
    #[must_use]
    pub fn new(message_type: &str, correlation: Correlation, body: Element) -> Self {
        Self {
            message_type: message_type.to_owned(),
            correlation,
            body,
        }
    }
}

/// One event delivered by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event kind, driving dispatch.
    pub kind: EventKind,
    /// Messages carried by the event.
    pub messages: Vec<Message>,
    /// When the event was received locally.
    pub received_at: DateTime<Utc>,
}

impl Event {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn new(kind: EventKind, messages: Vec<Message>) -> Self {
        Self {
            kind,
            messages,
            received_at: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_tree_navigation() {
        let tree = Element::group(
            "securityData",
            vec![
                Element::scalar("security", "IBM US Equity"),
                Element::group(
                    "fieldData",
                    vec![
                        Element::scalar("PX_LAST", "101.25"),
                        Element::empty_scalar("PX_SETTLE"),
                    ],
                ),
            ],
        );

        assert!(tree.has_element("security"));
        assert_eq!(tree.child_value("security"), Some("IBM US Equity"));

        let field_data = tree.child("fieldData").unwrap();
        assert_eq!(field_data.children().len(), 2);
        assert_eq!(field_data.child_value("PX_LAST"), Some("101.25"));
        assert_eq!(field_data.child_value("PX_SETTLE"), None);
        assert!(!tree.has_element("securityError"));
    }

    #[test]
    fn scalar_and_sequence_discrimination() {
        let leaf = Element::scalar("BID", "99.5");
        assert!(leaf.is_scalar());
        assert!(!leaf.is_sequence());
        assert!(leaf.children().is_empty());

        let bulk = Element::sequence("DVD_HIST", vec![leaf.clone()]);
        assert!(bulk.is_sequence());
        assert!(!bulk.is_scalar());
        assert_eq!(bulk.scalar_value(), None);
    }

    #[test]
    fn correlation_payloads() {
        let by_ticker = Correlation::Ticker(Arc::from("AAPL US Equity"));
        assert_eq!(by_ticker.ticker(), Some("AAPL US Equity"));
        assert_eq!(by_ticker.id(), None);

        let by_id = Correlation::Id(7);
        assert_eq!(by_id.id(), Some(7));
        assert_eq!(by_id.ticker(), None);
        assert_eq!(Correlation::None.ticker(), None);
    }

    #[test]
    fn element_renders_as_json() {
        let tree = Element::group("root", vec![Element::scalar("BID", "99.5")]);
        let json = tree.to_json();
        assert!(json.contains("\"root\""));
        assert!(json.contains("99.5"));
    }
}
