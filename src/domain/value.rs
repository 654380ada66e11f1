//! Typed Field Values
//!
//! A field value holds exactly one of: owned UTF-8 text, a 64-bit float,
//! a signed integer, an unsigned integer, or an opaque shared handle.
//!
//! # Lenient numeric conversion
//!
//! Wire values arrive as strings and upstream data is noisy. Numeric
//! conversion therefore parses the longest valid numeric prefix and falls
//! back to `0` / `0.0` instead of failing. Application code that needs to
//! distinguish "absent" from "zero" checks field presence first.

use std::any::Any;
use std::sync::Arc;

// =============================================================================
// Types
// =============================================================================

/// Opaque caller-owned payload stored under the Handle kind.
///
/// The store never interprets the payload; shared ownership via `Arc`
/// means the store holds a reference without ever dropping the caller's
/// data early.
pub type Handle = Arc<dyn Any + Send + Sync>;

/// Discriminant for the kind of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// UTF-8 text.
    Text,
    /// 64-bit float.
    Decimal,
    /// Signed 64-bit integer.
    Integer,
    /// Unsigned 64-bit integer.
    Unsigned,
    /// Opaque shared handle.
    Handle,
}

impl FieldKind {
    /// Human-readable kind name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Unsigned => "unsigned",
            Self::Handle => "handle",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed field value.
#[derive(Clone)]
pub enum FieldValue {
    /// Owned UTF-8 text.
    Text(String),
    /// 64-bit float.
    Decimal(f64),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Unsigned 64-bit integer.
    Unsigned(u64),
    /// Opaque shared handle; never interpreted by the store.
    Handle(Handle),
}

impl FieldValue {
    /// The kind of this value.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Decimal(_) => FieldKind::Decimal,
            Self::Integer(_) => FieldKind::Integer,
            Self::Unsigned(_) => FieldKind::Unsigned,
            Self::Handle(_) => FieldKind::Handle,
        }
    }

    /// Convert a raw wire string into a value of the declared kind.
    ///
    /// Numeric kinds use lenient conversion; the Handle kind cannot come
    /// off the wire and converts as text.
    #[must_use]
    pub fn from_wire(kind: FieldKind, raw: &str) -> Self {
        match kind {
            FieldKind::Decimal => Self::Decimal(lenient_f64(raw)),
            FieldKind::Integer => Self::Integer(lenient_i64(raw)),
            FieldKind::Unsigned => Self::Unsigned(lenient_u64(raw)),
            FieldKind::Text | FieldKind::Handle => Self::Text(raw.to_owned()),
        }
    }

    /// Text payload, if this is a Text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Decimal payload, if this is a Decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Option<f64> {
        match self {
            Self::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer payload, if this is an Integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Unsigned payload, if this is an Unsigned value.
    #[must_use]
    pub const fn as_unsigned(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    /// Handle payload, if this is a Handle value.
    #[must_use]
    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Self::Handle(h) => Some(Arc::clone(h)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Decimal(v) => f.debug_tuple("Decimal").field(v).finish(),
            Self::Integer(v) => f.debug_tuple("Integer").field(v).finish(),
            Self::Unsigned(v) => f.debug_tuple("Unsigned").field(v).finish(),
            Self::Handle(_) => f.write_str("Handle(..)"),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Unsigned(a), Self::Unsigned(b)) => a == b,
            // Handles compare by identity.
            (Self::Handle(a), Self::Handle(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// =============================================================================
// Lenient Parsing
// =============================================================================

/// Parse the longest valid float prefix; `0.0` when none exists.
#[must_use]
pub fn lenient_f64(raw: &str) -> f64 {
    let s = raw.trim_start();
    let prefix = float_prefix(s);
    prefix.parse().unwrap_or(0.0)
}

/// Parse the longest valid signed-integer prefix; `0` when none exists.
#[must_use]
pub fn lenient_i64(raw: &str) -> i64 {
    let s = raw.trim_start();
    let prefix = integer_prefix(s, true);
    prefix.parse().unwrap_or(0)
}

/// Parse the longest valid unsigned-integer prefix; `0` when none exists.
#[must_use]
pub fn lenient_u64(raw: &str) -> u64 {
    let s = raw.trim_start();
    let prefix = integer_prefix(s, false);
    prefix.parse().unwrap_or(0)
}

/// Longest prefix of `s` that forms a decimal float literal.
fn float_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return "";
    }

    // Exponent only counts when digits follow it.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    &s[..end]
}

/// Longest prefix of `s` that forms an integer literal.
fn integer_prefix(s: &str, signed: bool) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;

    match bytes.first() {
        Some(b'+') => end = 1,
        Some(b'-') if signed => end = 1,
        _ => {}
    }

    let digits = count_digits(&bytes[end..]);
    if digits == 0 {
        return "";
    }

    &s[..end + digits]
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

// =============================================================================
// Tests
// =============================================================================
