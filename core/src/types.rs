//! Shared primitive types used across the entire pipeline.

use chrono::NaiveDateTime;

/// A stable identifier for one raw customer record (order-side key).
pub type CustomerId = String;

/// The deduplicated customer identity key.
pub type CustomerUniqueId = String;

/// A stable, unique identifier for an order.
pub type OrderId = String;

/// A stable, unique identifier for a product.
pub type ProductId = String;

/// The canonical run identifier.
pub type RunId = String;

/// Timestamp format shared by every TEXT timestamp column.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_ts(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).ok()
}

pub fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Round to cent precision. All monetary output columns go through this.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round to 4 decimal places. Ratios and fractional means.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
