//! Identity resolution stage — collapses raw customer records into one
//! canonical row per unique customer.
//!
//! This stage:
//!   1. Groups raw records by customer_unique_id
//!   2. Resolves the location by majority vote over observed
//!      (city, state, zip) combinations
//!   3. Breaks exact count ties by ascending city, state, zip — never by
//!      input row order
//!   4. Attaches first/last delivered purchase, order count and tenure
//!
//! Location-only customers (no delivered order) still resolve; their
//! order-derived fields stay NULL.

use crate::{
    error::{PipelineError, PipelineResult},
    raw::RawCustomerRecord,
    stage::{FactStage, StageContext, StageReport},
    types::{fmt_ts, parse_ts, CustomerUniqueId},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCustomer {
    pub customer_unique_id: CustomerUniqueId,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_prefix: Option<String>,
    pub first_order_ts: Option<String>,
    pub last_order_ts: Option<String>,
    pub delivered_orders: i64,
    pub tenure_days: Option<i64>,
}

/// Observed location combination. Option<String> ordering puts NULLs first,
/// which keeps the tie-break total.
type LocationKey = (Option<String>, Option<String>, Option<String>);

#[derive(Debug, Default)]
struct OrderSpan {
    first: Option<NaiveDateTime>,
    last: Option<NaiveDateTime>,
    count: i64,
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct IdentityStage;

impl IdentityStage {
    pub fn new() -> Self {
        Self
    }

    /// Majority vote over a customer's observed locations. Returns the
    /// winning combination and whether the win was an exact count tie.
    fn resolve_location(records: &[&RawCustomerRecord]) -> (LocationKey, bool) {
        let mut votes: BTreeMap<LocationKey, usize> = BTreeMap::new();
        for r in records {
            let key = (r.city.clone(), r.state.clone(), r.zip_prefix.clone());
            *votes.entry(key).or_insert(0) += 1;
        }

        // BTreeMap iterates keys ascending (city, state, zip), so keeping
        // the first key with the strictly-highest count IS the documented
        // tie-break: lowest city, then state, then zip wins.
        let mut winner: Option<(&LocationKey, usize)> = None;
        let mut tied = false;
        for (key, &count) in &votes {
            match winner {
                Some((_, best)) if count > best => {
                    winner = Some((key, count));
                    tied = false;
                }
                Some((_, best)) if count == best => tied = true,
                None => winner = Some((key, count)),
                _ => {}
            }
        }

        let (key, _) = winner.expect("group has at least one record");
        (key.clone(), tied)
    }
}

impl Default for IdentityStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FactStage for IdentityStage {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn output_table(&self) -> &'static str {
        "canonical_customer"
    }

    fn run(&mut self, ctx: &StageContext<'_>) -> PipelineResult<StageReport> {
        let raw = ctx.store.load_raw_customers(ctx.run_id)?;
        let delivered = ctx.store.load_delivered_orders(ctx.run_id)?;

        // customer_id -> unique_id mapping for order attribution.
        let id_to_unique: HashMap<&str, &str> = raw
            .iter()
            .map(|r| (r.customer_id.as_str(), r.customer_unique_id.as_str()))
            .collect();

        // Delivered purchase spans per unique customer.
        let mut spans: HashMap<&str, OrderSpan> = HashMap::new();
        for order in &delivered {
            let Some(&unique) = id_to_unique.get(order.customer_id.as_str()) else {
                continue; // unattributable orders are flagged by the fact builder
            };
            let ts_str = order.purchase_ts.as_deref().expect("delivered subset");
            let ts = parse_ts(ts_str).ok_or_else(|| PipelineError::BadTimestamp {
                table: "raw_orders",
                value: ts_str.to_string(),
            })?;

            let span = spans.entry(unique).or_default();
            span.count += 1;
            span.first = Some(span.first.map_or(ts, |f| f.min(ts)));
            span.last = Some(span.last.map_or(ts, |l| l.max(ts)));
        }

        // Group records by unique id; BTreeMap gives deterministic output order.
        let mut groups: BTreeMap<&str, Vec<&RawCustomerRecord>> = BTreeMap::new();
        for r in &raw {
            groups.entry(r.customer_unique_id.as_str()).or_default().push(r);
        }

        let mut report = StageReport::default();
        let mut rows = Vec::with_capacity(groups.len());
        for (unique, records) in &groups {
            let ((city, state, zip_prefix), tied) = Self::resolve_location(records);
            if tied {
                log::warn!(
                    "stage=identity location vote tied for {unique}; resolved lexically"
                );
                report.flag("identity_location_tie", unique.to_string());
            }

            let span = spans.get(unique);
            let (first, last, count) = match span {
                Some(s) => (s.first, s.last, s.count),
                None => (None, None, 0),
            };
            let tenure_days = match (first, last) {
                (Some(f), Some(l)) => Some((l.date() - f.date()).num_days()),
                _ => None,
            };

            rows.push(CanonicalCustomer {
                customer_unique_id: unique.to_string(),
                city,
                state,
                zip_prefix,
                first_order_ts: first.map(fmt_ts),
                last_order_ts: last.map(fmt_ts),
                delivered_orders: count,
                tenure_days,
            });
        }

        ctx.store.replace_canonical_customers(ctx.run_id, &rows)?;
        report.rows_written = rows.len() as u64;
        Ok(report)
    }
}
