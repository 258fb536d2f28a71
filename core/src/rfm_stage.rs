//! RFM aggregation stage — one row per customer over the order facts.
//!
//! recency_days is measured against the dataset horizon the engine passes
//! in, never against the wall clock, so a frozen extract always reproduces
//! the same table.

use crate::{
    error::{PipelineError, PipelineResult},
    horizon::DatasetHorizon,
    order_facts_stage::OrderFact,
    stage::{FeatureStage, StageContext, StageReport},
    types::{parse_ts, round2, round4, CustomerUniqueId},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRfm {
    pub customer_unique_id: CustomerUniqueId,
    pub recency_days: i64,
    pub frequency: i64,
    pub monetary: f64,
    pub avg_order_value: f64,
    pub avg_items_per_order: f64,
    pub avg_category_diversity: f64,
    pub first_order_ts: String,
    pub last_order_ts: String,
    pub tenure_days: i64,
    /// Mean consecutive-order gap in days. NULL for single-order customers:
    /// one order implies no observed cadence, which is not the same as a
    /// gap of zero.
    pub avg_days_between_orders: Option<f64>,
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct RfmStage;

impl RfmStage {
    pub fn new() -> Self {
        Self
    }

    fn aggregate_customer(
        customer: &str,
        facts: &[&OrderFact],
        horizon: &DatasetHorizon,
    ) -> PipelineResult<CustomerRfm> {
        let mut timestamps: Vec<NaiveDateTime> = Vec::with_capacity(facts.len());
        for f in facts {
            let ts = parse_ts(&f.purchase_ts).ok_or_else(|| PipelineError::BadTimestamp {
                table: "order_fact",
                value: f.purchase_ts.clone(),
            })?;
            timestamps.push(ts);
        }
        timestamps.sort();

        let first = timestamps[0];
        let last = *timestamps.last().expect("group is non-empty");
        let n = facts.len() as f64;

        let gross_sum: f64 = facts.iter().map(|f| f.gross_order_value).sum();
        let item_sum: f64 = facts.iter().map(|f| f.item_count as f64).sum();
        let category_sum: f64 = facts.iter().map(|f| f.distinct_categories as f64).sum();

        let avg_days_between_orders = if timestamps.len() > 1 {
            let gap_sum: i64 = timestamps
                .windows(2)
                .map(|w| (w[1].date() - w[0].date()).num_days())
                .sum();
            Some(round4(gap_sum as f64 / (timestamps.len() - 1) as f64))
        } else {
            None
        };

        Ok(CustomerRfm {
            customer_unique_id: customer.to_string(),
            recency_days: horizon.days_since(last),
            frequency: facts.len() as i64,
            monetary: round2(gross_sum),
            avg_order_value: round2(gross_sum / n),
            avg_items_per_order: round4(item_sum / n),
            avg_category_diversity: round4(category_sum / n),
            first_order_ts: facts
                .iter()
                .map(|f| f.purchase_ts.clone())
                .min()
                .expect("group is non-empty"),
            last_order_ts: facts
                .iter()
                .map(|f| f.purchase_ts.clone())
                .max()
                .expect("group is non-empty"),
            tenure_days: (last.date() - first.date()).num_days(),
            avg_days_between_orders,
        })
    }
}

impl Default for RfmStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStage for RfmStage {
    fn name(&self) -> &'static str {
        "rfm"
    }

    fn output_table(&self) -> &'static str {
        "customer_rfm"
    }

    fn run(
        &mut self,
        ctx: &StageContext<'_>,
        horizon: &DatasetHorizon,
    ) -> PipelineResult<StageReport> {
        let facts = ctx.store.load_order_facts(ctx.run_id)?;

        // Facts arrive ordered by customer; group with a single linear scan.
        let mut rows = Vec::new();
        let mut group: Vec<&OrderFact> = Vec::new();
        for fact in &facts {
            if let Some(prev) = group.last() {
                if prev.customer_unique_id != fact.customer_unique_id {
                    let customer = group[0].customer_unique_id.clone();
                    rows.push(Self::aggregate_customer(&customer, &group, horizon)?);
                    group.clear();
                }
            }
            group.push(fact);
        }
        if !group.is_empty() {
            let customer = group[0].customer_unique_id.clone();
            rows.push(Self::aggregate_customer(&customer, &group, horizon)?);
        }

        ctx.store.replace_customer_rfm(ctx.run_id, &rows)?;
        Ok(StageReport::rows(rows.len() as u64))
    }
}
