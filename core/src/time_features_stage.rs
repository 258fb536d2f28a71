//! Time-window feature stage — rolling 30/90/180-day behaviour per
//! customer, plus lifetime totals and derived ratios.
//!
//! Windows are measured against the same horizon the RFM stage receives;
//! the engine computes it once, so the two tables cannot drift apart
//! between recomputations. The zero-valued ratios here are true "no recent
//! activity" zeros, not missing values — recent silence is itself signal
//! for the downstream churn model.

use crate::{
    error::{PipelineError, PipelineResult},
    horizon::DatasetHorizon,
    order_facts_stage::OrderFact,
    stage::{FeatureStage, StageContext, StageReport},
    types::{parse_ts, round2, round4, CustomerUniqueId},
};
use serde::{Deserialize, Serialize};

pub const WINDOWS_DAYS: [i64; 3] = [30, 90, 180];

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerTimeFeatures {
    pub customer_unique_id: CustomerUniqueId,
    pub spend_30d: f64,
    pub spend_90d: f64,
    pub spend_180d: f64,
    pub orders_30d: i64,
    pub orders_90d: i64,
    pub orders_180d: i64,
    pub lifetime_orders: i64,
    pub lifetime_spend: f64,
    pub avg_order_value_180d: f64,
    pub recent_order_ratio: f64,
    pub recent_spend_ratio: f64,
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct TimeFeaturesStage;

impl TimeFeaturesStage {
    pub fn new() -> Self {
        Self
    }

    fn aggregate_customer(
        customer: &str,
        facts: &[&OrderFact],
        horizon: &DatasetHorizon,
    ) -> PipelineResult<CustomerTimeFeatures> {
        let mut spend = [0.0f64; 3];
        let mut orders = [0i64; 3];
        let mut lifetime_spend = 0.0f64;

        for f in facts {
            let ts = parse_ts(&f.purchase_ts).ok_or_else(|| PipelineError::BadTimestamp {
                table: "order_fact",
                value: f.purchase_ts.clone(),
            })?;
            lifetime_spend += f.gross_order_value;
            for (i, w) in WINDOWS_DAYS.iter().enumerate() {
                if horizon.in_window(ts, *w) {
                    spend[i] += f.gross_order_value;
                    orders[i] += 1;
                }
            }
        }

        let lifetime_orders = facts.len() as i64;
        let avg_order_value_180d = if orders[2] > 0 {
            round2(spend[2] / orders[2] as f64)
        } else {
            0.0
        };
        let recent_order_ratio = if lifetime_orders > 0 {
            round4(orders[2] as f64 / lifetime_orders as f64)
        } else {
            0.0
        };
        let recent_spend_ratio = if lifetime_spend > 0.0 {
            round4(spend[2] / lifetime_spend)
        } else {
            0.0
        };

        Ok(CustomerTimeFeatures {
            customer_unique_id: customer.to_string(),
            spend_30d: round2(spend[0]),
            spend_90d: round2(spend[1]),
            spend_180d: round2(spend[2]),
            orders_30d: orders[0],
            orders_90d: orders[1],
            orders_180d: orders[2],
            lifetime_orders,
            lifetime_spend: round2(lifetime_spend),
            avg_order_value_180d,
            recent_order_ratio,
            recent_spend_ratio,
        })
    }
}

impl Default for TimeFeaturesStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStage for TimeFeaturesStage {
    fn name(&self) -> &'static str {
        "time_features"
    }

    fn output_table(&self) -> &'static str {
        "customer_time_features"
    }

    fn run(
        &mut self,
        ctx: &StageContext<'_>,
        horizon: &DatasetHorizon,
    ) -> PipelineResult<StageReport> {
        let facts = ctx.store.load_order_facts(ctx.run_id)?;

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

        ctx.store.replace_time_features(ctx.run_id, &rows)?;
        Ok(StageReport::rows(rows.len() as u64))
    }
}
