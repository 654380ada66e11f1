//! Field Descriptor Catalog
//!
//! Compiled-in table mapping a field mnemonic to its declared value kind
//! and a human-readable description. The table is sorted by mnemonic and
//! never mutated after load, so reads are lock-free everywhere.
//!
//! Lookup is case-insensitive: feeds and application code disagree on
//! mnemonic casing often enough that case sensitivity here would be a
//! long tail of silent text-typed fields.

use std::cmp::Ordering;

use crate::domain::value::FieldKind;

// =============================================================================
// Descriptor
// =============================================================================

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field mnemonic, uppercase.
    pub mnemonic: &'static str,
    /// Declared value kind for this mnemonic.
    pub kind: FieldKind,
    /// Human-readable description.
    pub description: &'static str,
}

/// Static descriptor table, sorted by mnemonic.
static FIELDS: &[FieldDescriptor] = &[
    d("ASK", FieldKind::Decimal, "Ask price"),
    d("ASK_SIZE", FieldKind::Unsigned, "Number of shares offered at the ask"),
    d("BEST_ASK", FieldKind::Decimal, "Best ask price across venues"),
    d("BEST_BID", FieldKind::Decimal, "Best bid price across venues"),
    d("BID", FieldKind::Decimal, "Bid price"),
    d("BID_SIZE", FieldKind::Unsigned, "Number of shares wanted at the bid"),
    d("CHG_NET_1D", FieldKind::Decimal, "One day net price change"),
    d("CHG_PCT_1D", FieldKind::Decimal, "One day percent price change"),
    d("CRNCY", FieldKind::Text, "Trading currency"),
    d("CUR_MKT_CAP", FieldKind::Decimal, "Current market capitalization"),
    d("EQY_DVD_YLD_IND", FieldKind::Decimal, "Indicated dividend yield"),
    d("EQY_SH_OUT", FieldKind::Decimal, "Equity shares outstanding, millions"),
    d("EXCH_CODE", FieldKind::Text, "Primary exchange code"),
    d("GICS_SECTOR_NAME", FieldKind::Text, "GICS sector name"),
    d("HIGH", FieldKind::Decimal, "Session high price"),
    d("ID_BB_UNIQUE", FieldKind::Text, "Unique terminal identifier"),
    d("ID_CUSIP", FieldKind::Text, "CUSIP identifier"),
    d("ID_ISIN", FieldKind::Text, "ISIN identifier"),
    d("ID_SEDOL1", FieldKind::Text, "Primary SEDOL identifier"),
    d("INDUSTRY_SECTOR", FieldKind::Text, "Industry sector name"),
    d("LAST_PRICE", FieldKind::Decimal, "Last traded price"),
    d("LAST_UPDATE", FieldKind::Text, "Time of last update"),
    d("LOW", FieldKind::Decimal, "Session low price"),
    d("MARKET_SECTOR_DES", FieldKind::Text, "Market sector description"),
    d("NAME", FieldKind::Text, "Issuer name"),
    d("OPEN", FieldKind::Decimal, "Session opening price"),
    d("OPEN_INT", FieldKind::Unsigned, "Open interest"),
    d("PE_RATIO", FieldKind::Decimal, "Price to earnings ratio"),
    d("PX_ASK", FieldKind::Decimal, "Ask price"),
    d("PX_BID", FieldKind::Decimal, "Bid price"),
    d("PX_HIGH", FieldKind::Decimal, "Session high price"),
    d("PX_LAST", FieldKind::Decimal, "Last traded price"),
    d("PX_LOW", FieldKind::Decimal, "Session low price"),
    d("PX_OPEN", FieldKind::Decimal, "Session opening price"),
    d("PX_SETTLE", FieldKind::Decimal, "Settlement price"),
    d("PX_VOLUME", FieldKind::Unsigned, "Session traded volume"),
    d("SECURITY_DES", FieldKind::Text, "Security description"),
    d("SECURITY_TYP", FieldKind::Text, "Security type"),
    d("SIZE_LAST_TRADE", FieldKind::Unsigned, "Size of the last trade"),
    d("TICKER", FieldKind::Text, "Ticker symbol"),
    d("TIME", FieldKind::Text, "Time of last tick"),
    d("VOLUME", FieldKind::Unsigned, "Cumulative session volume"),
    d("VOLUME_AVG_30D", FieldKind::Decimal, "Thirty day average volume"),
    d("YLD_YTM_MID", FieldKind::Decimal, "Mid yield to maturity"),
];

const fn d(
    mnemonic: &'static str,
    kind: FieldKind,
    description: &'static str,
) -> FieldDescriptor {
    FieldDescriptor {
        mnemonic,
        kind,
        description,
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Number of catalog entries.
#[must_use]
pub fn count() -> usize {
    FIELDS.len()
}

/// Exact (case-insensitive) lookup of a descriptor.
#[must_use]
pub fn descriptor(mnemonic: &str) -> Option<&'static FieldDescriptor> {
    FIELDS
        .binary_search_by(|entry| cmp_ignore_case(entry.mnemonic, mnemonic))
        .ok()
        .map(|index| &FIELDS[index])
}

/// Declared kind for a mnemonic, if cataloged.
#[must_use]
pub fn kind(mnemonic: &str) -> Option<FieldKind> {
    descriptor(mnemonic).map(|entry| entry.kind)
}

/// Description for a mnemonic, if cataloged.
#[must_use]
pub fn description(mnemonic: &str) -> Option<&'static str> {
    descriptor(mnemonic).map(|entry| entry.description)
}

/// Entry at `index` in mnemonic-sorted order.
#[must_use]
pub fn by_index(index: usize) -> Option<&'static FieldDescriptor> {
    FIELDS.get(index)
}

/// All entries whose mnemonic starts with `prefix` (case-insensitive).
///
/// Returns a contiguous slice of the sorted table; empty when nothing
/// matches.
#[must_use]
pub fn with_prefix(prefix: &str) -> &'static [FieldDescriptor] {
    let start = FIELDS.partition_point(|entry| {
        cmp_prefix(entry.mnemonic, prefix) == Ordering::Less
    });
    let end = start
        + FIELDS[start..]
            .iter()
            .take_while(|entry| starts_with_ignore_case(entry.mnemonic, prefix))
            .count();

    &FIELDS[start..end]
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    let a = a.bytes().map(|c| c.to_ascii_uppercase());
    let b = b.bytes().map(|c| c.to_ascii_uppercase());
    a.cmp(b)
}

/// Compare only the first `prefix.len()` bytes of `mnemonic`.
fn cmp_prefix(mnemonic: &str, prefix: &str) -> Ordering {
    let head = mnemonic.as_bytes().iter().take(prefix.len());
    let head = head.map(|c| c.to_ascii_uppercase());
    let prefix = prefix.bytes().map(|c| c.to_ascii_uppercase());
    head.cmp(prefix)
}

fn starts_with_ignore_case(mnemonic: &str, prefix: &str) -> bool {
    mnemonic.len() >= prefix.len()
        && mnemonic
            .bytes()
            .zip(prefix.bytes())
            .all(|(a, b)| a.to_ascii_uppercase() == b.to_ascii_uppercase())
}

// =============================================================================
// Tests
// =============================================================================
