//! Dataset horizon — the single time authority for every recency and
//! windowed computation.
//!
//! The horizon is computed exactly once per run, from the committed
//! order_fact table, and passed by reference into every feature stage.
//! No stage recomputes it; recency in customer_rfm and the rolling windows
//! in customer_time_features are guaranteed to agree by construction.

use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetHorizon {
    /// Maximum purchase timestamp across all delivered orders.
    pub max_purchase_ts: NaiveDateTime,
    /// First observed purchase date (date_dim range start).
    pub min_purchase_date: NaiveDate,
    /// Last observed purchase date (date_dim range end).
    pub max_purchase_date: NaiveDate,
}

impl DatasetHorizon {
    /// Whole days between the horizon and a purchase timestamp.
    /// Day arithmetic is date-level; time-of-day is ignored.
    pub fn days_since(&self, ts: NaiveDateTime) -> i64 {
        (self.max_purchase_ts.date() - ts.date()).num_days()
    }

    /// Window membership: a purchase D whole days before the horizon is
    /// inside window W iff 0 <= D <= W.
    pub fn in_window(&self, ts: NaiveDateTime, window_days: i64) -> bool {
        let d = self.days_since(ts);
        d >= 0 && d <= window_days
    }
}
