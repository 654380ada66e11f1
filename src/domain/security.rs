//! Security - Typed Per-Instrument Field Store
//!
//! One `Security` holds the typed field mapping and the request override
//! mapping for a single instrument. Field mnemonics are case-insensitive
//! and unique; the spelling of the first writer is kept for display.
//!
//! # Design
//!
//! Two mapping structures with different access patterns:
//! - fields: unordered map keyed by canonical (uppercase) mnemonic, for
//!   per-field lookup,
//! - overrides: ordered map, so a consuming request sees overrides in a
//!   deterministic field-id order.
//!
//! Every accessor and mutator takes the instance lock for its full
//! critical section and never blocks on I/O, so a delivery thread folding
//! wire data and a consumer thread reading fields interleave safely.

use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use parking_lot::Mutex;

use crate::domain::catalog;
use crate::domain::value::{FieldKind, FieldValue, Handle};

// =============================================================================
// Errors
// =============================================================================

/// Contract violations on the typed store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    /// A typed setter addressed an existing field of a different kind.
    ///
    /// This is a programming error, not feed noise: the store never
    /// silently reinterprets a field's kind.
    #[error("field `{field}` holds {found} but was written as {expected}")]
    KindMismatch {
        /// Field mnemonic as first written.
        field: String,
        /// Kind the setter tried to write.
        expected: FieldKind,
        /// Kind already stored.
        found: FieldKind,
    },
}

// =============================================================================
// Security
// =============================================================================

/// A request-scoped override: `(field id, raw value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// Field id the override applies to.
    pub field_id: String,
    /// Raw override value, passed through to the wire.
    pub value: String,
}

#[derive(Debug, Clone)]
struct Field {
    /// Display spelling (first writer wins).
    name: String,
    value: FieldValue,
}

#[derive(Debug, Default)]
struct Inner {
    ticker: Option<String>,
    fields: HashMap<String, Field>,
    overrides: BTreeMap<String, Override>,
}

/// Typed field store for one instrument.
///
/// Thread-safe; share between threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct Security {
    inner: Mutex<Inner>,
}

fn canon(field: &str) -> String {
    field.to_ascii_uppercase()
}

impl Security {
    /// Create an empty store with no ticker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the ticker already set.
    #[must_use]
    pub fn with_ticker(ticker: &str) -> Self {
        let security = Self::new();
        security.set_ticker(ticker);
        security
    }

    // -------------------------------------------------------------------------
    // Ticker
    // -------------------------------------------------------------------------

    /// The instrument ticker, once known.
    #[must_use]
    pub fn ticker(&self) -> Option<String> {
        self.inner.lock().ticker.clone()
    }

    /// Set the ticker. Set once at creation or on first response;
    /// later calls overwrite, which normal use never does.
    pub fn set_ticker(&self, ticker: &str) {
        self.inner.lock().ticker = Some(ticker.to_owned());
    }

    // -------------------------------------------------------------------------
    // Typed field access
    // -------------------------------------------------------------------------

    /// Whether a field exists under `field` (case-insensitive).
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.inner.lock().fields.contains_key(&canon(field))
    }

    /// Number of fields present.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.inner.lock().fields.len()
    }

    /// Stored kind of `field`, if present.
    #[must_use]
    pub fn field_kind(&self, field: &str) -> Option<FieldKind> {
        let inner = self.inner.lock();
        inner.fields.get(&canon(field)).map(|f| f.value.kind())
    }

    /// Snapshot of the stored value of `field`, if present.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<FieldValue> {
        let inner = self.inner.lock();
        inner.fields.get(&canon(field)).map(|f| f.value.clone())
    }

    /// Text value of `field`; `None` if absent or of another kind.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .fields
            .get(&canon(field))
            .and_then(|f| f.value.as_text().map(str::to_owned))
    }

    /// Decimal value of `field`; `None` if absent or of another kind.
    #[must_use]
    pub fn decimal(&self, field: &str) -> Option<f64> {
        let inner = self.inner.lock();
        inner.fields.get(&canon(field)).and_then(|f| f.value.as_decimal())
    }

    /// Integer value of `field`; `None` if absent or of another kind.
    #[must_use]
    pub fn integer(&self, field: &str) -> Option<i64> {
        let inner = self.inner.lock();
        inner.fields.get(&canon(field)).and_then(|f| f.value.as_integer())
    }

    /// Unsigned value of `field`; `None` if absent or of another kind.
    #[must_use]
    pub fn unsigned(&self, field: &str) -> Option<u64> {
        let inner = self.inner.lock();
        inner.fields.get(&canon(field)).and_then(|f| f.value.as_unsigned())
    }

    /// Handle value of `field`; `None` if absent or of another kind.
    #[must_use]
    pub fn handle(&self, field: &str) -> Option<Handle> {
        let inner = self.inner.lock();
        inner.fields.get(&canon(field)).and_then(|f| f.value.as_handle())
    }

    /// Set a text field.
    ///
    /// # Errors
    ///
    /// `KindMismatch` when the field exists with a non-text kind.
    pub fn set_text(&self, field: &str, value: &str) -> Result<(), SecurityError> {
        self.set_typed(field, FieldValue::Text(value.to_owned()))
    }

    /// Set a decimal field.
    ///
    /// # Errors
    ///
    /// `KindMismatch` when the field exists with a non-decimal kind.
    pub fn set_decimal(&self, field: &str, value: f64) -> Result<(), SecurityError> {
        self.set_typed(field, FieldValue::Decimal(value))
    }

    /// Set an integer field.
    ///
    /// # Errors
    ///
    /// `KindMismatch` when the field exists with a non-integer kind.
    pub fn set_integer(&self, field: &str, value: i64) -> Result<(), SecurityError> {
        self.set_typed(field, FieldValue::Integer(value))
    }

    /// Set an unsigned field.
    ///
    /// # Errors
    ///
    /// `KindMismatch` when the field exists with a non-unsigned kind.
    pub fn set_unsigned(&self, field: &str, value: u64) -> Result<(), SecurityError> {
        self.set_typed(field, FieldValue::Unsigned(value))
    }

    /// Set a handle field.
    ///
    /// # Errors
    ///
    /// `KindMismatch` when the field exists with a non-handle kind.
    pub fn set_handle(&self, field: &str, value: Handle) -> Result<(), SecurityError> {
        self.set_typed(field, FieldValue::Handle(value))
    }

    fn set_typed(&self, field: &str, value: FieldValue) -> Result<(), SecurityError> {
        let mut inner = self.inner.lock();
        match inner.fields.entry(canon(field)) {
            Entry::Occupied(mut entry) => {
                let found = entry.get().value.kind();
                if found != value.kind() {
                    return Err(SecurityError::KindMismatch {
                        field: entry.get().name.clone(),
                        expected: value.kind(),
                        found,
                    });
                }
                entry.get_mut().value = value;
            }
            Entry::Vacant(entry) => {
                entry.insert(Field {
                    name: field.to_owned(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Ingest a raw wire value under `field`.
    ///
    /// The declared kind comes from the catalog (text when the mnemonic is
    /// unknown); conversion is lenient, so ingestion always leaves a field
    /// of the declared kind present. Any prior field under the mnemonic is
    /// replaced whole, whatever its kind was.
    pub fn ingest(&self, field: &str, raw: &str) {
        let declared = catalog::kind(field).unwrap_or(FieldKind::Text);
        let value = FieldValue::from_wire(declared, raw);

        let mut inner = self.inner.lock();
        inner.fields.insert(
            canon(field),
            Field {
                name: field.to_owned(),
                value,
            },
        );
    }

    /// Snapshot iterator over the mnemonics currently present.
    ///
    /// Each call takes an independent snapshot, so any number of
    /// iterations can run concurrently; none observes writes made after
    /// its snapshot.
    #[must_use]
    pub fn field_names(&self) -> FieldNames {
        let inner = self.inner.lock();
        let names: Vec<String> = inner.fields.values().map(|f| f.name.clone()).collect();
        FieldNames {
            names: names.into_iter(),
        }
    }

    // -------------------------------------------------------------------------
    // Overrides
    // -------------------------------------------------------------------------

    /// Add (or replace) a request override for `field_id`.
    pub fn add_override(&self, field_id: &str, value: &str) {
        let mut inner = self.inner.lock();
        inner.overrides.insert(
            canon(field_id),
            Override {
                field_id: field_id.to_owned(),
                value: value.to_owned(),
            },
        );
    }

    /// Remove the override for `field_id`; `true` when one existed.
    pub fn remove_override(&self, field_id: &str) -> bool {
        self.inner.lock().overrides.remove(&canon(field_id)).is_some()
    }

    /// Whether an override exists for `field_id`.
    #[must_use]
    pub fn has_override(&self, field_id: &str) -> bool {
        self.inner.lock().overrides.contains_key(&canon(field_id))
    }

    /// Number of pending overrides.
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.inner.lock().overrides.len()
    }

    /// Drop all pending overrides.
    pub fn clear_overrides(&self) {
        self.inner.lock().overrides.clear();
    }

    /// Take the pending overrides in field-id order, clearing them.
    ///
    /// A reference-data request consumes the overrides exactly once; the
    /// deterministic order keeps outgoing requests reproducible.
    #[must_use]
    pub fn take_overrides(&self) -> Vec<Override> {
        let mut inner = self.inner.lock();
        let overrides = std::mem::take(&mut inner.overrides);
        overrides.into_values().collect()
    }
}

/// Caller-owned snapshot iterator over field mnemonics.
#[derive(Debug)]
pub struct FieldNames {
    names: std::vec::IntoIter<String>,
}

impl Iterator for FieldNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.names.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}

impl ExactSizeIterator for FieldNames {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn typed_setter_creates_then_updates() {
        let security = Security::new();

        security.set_decimal("PX_LAST", 100.0).unwrap();
        assert_eq!(security.decimal("PX_LAST"), Some(100.0));

        security.set_decimal("PX_LAST", 101.25).unwrap();
        assert_eq!(security.decimal("PX_LAST"), Some(101.25));
        assert_eq!(security.field_count(), 1);
    }

    #[test]
    fn typed_setter_rejects_kind_change() {
        let security = Security::new();
        security.set_decimal("PX_LAST", 100.0).unwrap();

        let err = security.set_text("PX_LAST", "oops").unwrap_err();
        assert_eq!(
            err,
            SecurityError::KindMismatch {
                field: "PX_LAST".to_owned(),
                expected: FieldKind::Text,
                found: FieldKind::Decimal,
            }
        );

        // Stored value untouched.
        assert_eq!(security.decimal("PX_LAST"), Some(100.0));
    }

    #[test]
    fn getters_are_kind_checked() {
        let security = Security::new();
        security.set_integer("SIZE_LAST_TRADE", -1).unwrap();

        assert_eq!(security.integer("SIZE_LAST_TRADE"), Some(-1));
        assert_eq!(security.decimal("SIZE_LAST_TRADE"), None);
        assert_eq!(security.text("SIZE_LAST_TRADE"), None);
        assert_eq!(security.decimal("MISSING"), None);
    }

    #[test]
    fn mnemonics_are_case_insensitive() {
        let security = Security::new();
        security.set_text("Crncy", "USD").unwrap();

        assert!(security.has_field("CRNCY"));
        assert!(security.has_field("crncy"));
        assert_eq!(security.text("CRNCY").as_deref(), Some("USD"));
        assert_eq!(security.field_kind("crncy"), Some(FieldKind::Text));
    }

    #[test]
    fn ingest_uses_catalog_kind() {
        let security = Security::new();

        security.ingest("PX_LAST", "101.25");
        assert_eq!(security.field_kind("PX_LAST"), Some(FieldKind::Decimal));
        assert_eq!(security.decimal("PX_LAST"), Some(101.25));

        security.ingest("VOLUME", "123456");
        assert_eq!(security.unsigned("VOLUME"), Some(123_456));

        // Unknown mnemonic defaults to text.
        security.ingest("SOME_CUSTOM_FIELD", "hello");
        assert_eq!(security.field_kind("SOME_CUSTOM_FIELD"), Some(FieldKind::Text));
        assert_eq!(security.text("SOME_CUSTOM_FIELD").as_deref(), Some("hello"));
    }

    #[test]
    fn ingest_is_lenient_but_field_stays_present() {
        let security = Security::new();

        security.ingest("PX_LAST", "101.25");
        security.ingest("PX_LAST", "not-a-number");

        assert!(security.has_field("PX_LAST"));
        assert_eq!(security.field_kind("PX_LAST"), Some(FieldKind::Decimal));
        assert_eq!(security.decimal("PX_LAST"), Some(0.0));
    }

    #[test]
    fn ingest_replaces_whatever_was_there() {
        let security = Security::new();
        security.set_handle("PX_LAST", Arc::new(1_u8)).unwrap();

        // Ingestion replaces whole fields, so the catalog kind wins even
        // over a mismatched prior kind.
        security.ingest("PX_LAST", "99.5");
        assert_eq!(security.field_kind("PX_LAST"), Some(FieldKind::Decimal));
        assert_eq!(security.decimal("PX_LAST"), Some(99.5));
    }

    #[test]
    fn field_names_is_an_independent_snapshot() {
        let security = Security::new();
        security.set_decimal("PX_LAST", 1.0).unwrap();
        security.set_text("NAME", "Acme Corp").unwrap();

        let mut first = security.field_names();
        let second = security.field_names();
        assert_eq!(first.len(), 2);

        // A write after the snapshot is invisible to it.
        security.set_text("CRNCY", "USD").unwrap();
        assert_eq!(second.count(), 2);
        assert_eq!(security.field_names().count(), 3);

        let name = first.next();
        assert!(name.is_some());
    }

    #[test]
    fn overrides_in_field_id_order_and_consumed_once() {
        let security = Security::new();
        security.add_override("VWAP_START_TIME", "9:30");
        security.add_override("EQY_FUND_CRNCY", "JPY");
        security.add_override("PRICING_SOURCE", "BGN");

        assert!(security.has_override("eqy_fund_crncy"));
        assert_eq!(security.override_count(), 3);

        let taken = security.take_overrides();
        let ids: Vec<_> = taken.iter().map(|o| o.field_id.as_str()).collect();
        assert_eq!(ids, vec!["EQY_FUND_CRNCY", "PRICING_SOURCE", "VWAP_START_TIME"]);

        assert_eq!(security.override_count(), 0);
        assert!(!security.has_override("PRICING_SOURCE"));
        assert!(security.take_overrides().is_empty());
    }

    #[test]
    fn override_remove_and_clear() {
        let security = Security::new();
        security.add_override("PRICING_SOURCE", "BGN");

        assert!(security.remove_override("pricing_source"));
        assert!(!security.remove_override("PRICING_SOURCE"));

        security.add_override("PRICING_SOURCE", "BGN");
        security.clear_overrides();
        assert_eq!(security.override_count(), 0);
    }

    #[test]
    fn ticker_set_once_then_read() {
        let security = Security::with_ticker("IBM US Equity");
        assert_eq!(security.ticker().as_deref(), Some("IBM US Equity"));

        let bare = Security::new();
        assert_eq!(bare.ticker(), None);
        bare.set_ticker("AAPL US Equity");
        assert_eq!(bare.ticker().as_deref(), Some("AAPL US Equity"));
    }

    #[test]
    fn concurrent_ingest_and_read() {
        use std::thread;

        let security = Arc::new(Security::new());
        let writer = {
            let security = Arc::clone(&security);
            thread::spawn(move || {
                for i in 0..1_000 {
                    security.ingest("PX_LAST", &format!("{i}.5"));
                    security.ingest("VOLUME", &i.to_string());
                }
            })
        };

        for _ in 0..1_000 {
            // Reads may observe any interleaving but never a torn field.
            if let Some(px) = security.decimal("PX_LAST") {
                assert!(px.fract() == 0.5 || px == 0.0);
            }
            let _ = security.unsigned("VOLUME");
        }

        writer.join().unwrap();
        assert_eq!(security.decimal("PX_LAST"), Some(999.5));
    }
}
