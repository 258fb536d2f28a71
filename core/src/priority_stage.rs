//! Prioritization stage — ranks customers by churn risk × value.
//!
//! Churn risk arrives from the external scoring component; this stage does
//! no scoring of its own. Bands are tertiles over a stable descending sort:
//! the input rows are pre-ordered by ascending customer id, and Rust's
//! stable sort preserves that order at boundary ties, so the tie-break is
//! ascending customer id. Band 1 is the top third.
//!
//! priority_band keeps the exact asymmetric rule from the retention
//! playbook: (1,1) is HIGH, (1,2) and (2,1) are MEDIUM, everything else is
//! LOW. Risk alone or value alone at the second tier still earns MEDIUM.

use crate::{
    error::PipelineResult,
    horizon::DatasetHorizon,
    stage::{FeatureStage, StageContext, StageReport},
    types::{round2, CustomerUniqueId},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedCustomer {
    pub customer_unique_id: CustomerUniqueId,
    pub churn_risk: f64,
    pub monetary: f64,
    pub value_at_risk: f64,
    pub churn_band: i64,
    pub value_band: i64,
    pub priority_band: String,
    pub recommended_action: String,
}

/// Tertile ranks (1..=3, 1 = highest key) over a stable descending sort.
/// The first ceil(n/3)-sized partitions take bands 1 and 2, the remainder
/// takes band 3.
pub fn tertile_bands(keys: &[f64]) -> Vec<i64> {
    let n = keys.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| keys[b].partial_cmp(&keys[a]).unwrap_or(Ordering::Equal));

    let chunk = n.div_ceil(3);
    let mut bands = vec![0i64; n];
    for (pos, &idx) in order.iter().enumerate() {
        bands[idx] = if pos < chunk {
            1
        } else if pos < 2 * chunk {
            2
        } else {
            3
        };
    }
    bands
}

pub fn priority_band(churn_band: i64, value_band: i64) -> &'static str {
    match (churn_band, value_band) {
        (1, 1) => "HIGH",
        (1, 2) | (2, 1) => "MEDIUM",
        _ => "LOW",
    }
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct PriorityStage;

impl PriorityStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PriorityStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStage for PriorityStage {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn output_table(&self) -> &'static str {
        "prioritized_customer"
    }

    fn run(
        &mut self,
        ctx: &StageContext<'_>,
        _horizon: &DatasetHorizon,
    ) -> PipelineResult<StageReport> {
        let rfm = ctx.store.load_customer_rfm(ctx.run_id)?;
        let scores = ctx.store.load_churn_scores(ctx.run_id)?;

        let risk_of: HashMap<&str, f64> = scores
            .iter()
            .map(|s| (s.customer_unique_id.as_str(), s.churn_risk))
            .collect();

        // Customers without a score are skipped, not defaulted: a fabricated
        // risk of zero would silently rank real customers.
        let mut report = StageReport::default();
        let mut ranked: Vec<(&str, f64, f64)> = Vec::with_capacity(rfm.len());
        for r in &rfm {
            match risk_of.get(r.customer_unique_id.as_str()) {
                Some(&risk) => ranked.push((r.customer_unique_id.as_str(), risk, r.monetary)),
                None => {
                    log::warn!(
                        "stage=priority no churn score for {}; skipped",
                        r.customer_unique_id
                    );
                    report.flag("customer_missing_churn_score", r.customer_unique_id.clone());
                }
            }
        }

        // Bands are computed independently of each other.
        let risk_keys: Vec<f64> = ranked.iter().map(|(_, risk, _)| *risk).collect();
        let value_keys: Vec<f64> = ranked.iter().map(|(_, _, monetary)| *monetary).collect();
        let churn_bands = tertile_bands(&risk_keys);
        let value_bands = tertile_bands(&value_keys);

        let mut rows = Vec::with_capacity(ranked.len());
        for (i, (customer, risk, monetary)) in ranked.iter().enumerate() {
            let band = priority_band(churn_bands[i], value_bands[i]);
            let action = ctx
                .config
                .actions
                .lookup(churn_bands[i], value_bands[i])
                .unwrap_or("Monitor");

            rows.push(PrioritizedCustomer {
                customer_unique_id: customer.to_string(),
                churn_risk: *risk,
                monetary: *monetary,
                value_at_risk: round2(risk * monetary),
                churn_band: churn_bands[i],
                value_band: value_bands[i],
                priority_band: band.to_string(),
                recommended_action: action.to_string(),
            });
        }

        ctx.store.replace_prioritized_customers(ctx.run_id, &rows)?;
        report.rows_written = rows.len() as u64;
        Ok(report)
    }
}
