//! Cohort assignment stage — one row per (customer, activity month).
//!
//! cohort_month is the month-truncated first delivered purchase;
//! month_index counts whole calendar months from the cohort month to the
//! activity month. Every customer's minimum month_index is exactly 0.

use crate::{
    error::{PipelineError, PipelineResult},
    horizon::DatasetHorizon,
    stage::{FeatureStage, StageContext, StageReport},
    types::{parse_ts, CustomerUniqueId},
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerCohort {
    pub customer_unique_id: CustomerUniqueId,
    /// First day of the first-purchase month ("YYYY-MM-01").
    pub cohort_month: String,
    /// First day of the activity month ("YYYY-MM-01").
    pub order_month: String,
    pub month_index: i64,
    pub segment_code: Option<String>,
}

/// (year, month) pair, the grain cohort arithmetic runs on.
pub type YearMonth = (i32, u32);

pub fn month_key(ym: YearMonth) -> String {
    format!("{:04}-{:02}-01", ym.0, ym.1)
}

/// Whole calendar months between a cohort month and a later activity month.
pub fn month_index(cohort: YearMonth, order: YearMonth) -> i64 {
    (order.0 as i64 - cohort.0 as i64) * 12 + (order.1 as i64 - cohort.1 as i64)
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct CohortStage;

impl CohortStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CohortStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStage for CohortStage {
    fn name(&self) -> &'static str {
        "cohort"
    }

    fn output_table(&self) -> &'static str {
        "customer_cohort"
    }

    fn run(
        &mut self,
        ctx: &StageContext<'_>,
        _horizon: &DatasetHorizon,
    ) -> PipelineResult<StageReport> {
        let facts = ctx.store.load_order_facts(ctx.run_id)?;

        // Distinct activity months and segment per customer.
        let mut months: BTreeMap<&str, BTreeSet<YearMonth>> = BTreeMap::new();
        let mut segment: BTreeMap<&str, Option<String>> = BTreeMap::new();
        for fact in &facts {
            let ts = parse_ts(&fact.purchase_ts).ok_or_else(|| PipelineError::BadTimestamp {
                table: "order_fact",
                value: fact.purchase_ts.clone(),
            })?;
            let ym = (ts.date().year(), ts.date().month());
            months
                .entry(fact.customer_unique_id.as_str())
                .or_default()
                .insert(ym);
            segment
                .entry(fact.customer_unique_id.as_str())
                .or_insert_with(|| fact.segment_code.clone());
        }

        let mut rows = Vec::new();
        for (customer, activity) in &months {
            let cohort = *activity.iter().next().expect("customer has activity");
            for ym in activity {
                rows.push(CustomerCohort {
                    customer_unique_id: customer.to_string(),
                    cohort_month: month_key(cohort),
                    order_month: month_key(*ym),
                    month_index: month_index(cohort, *ym),
                    segment_code: segment.get(customer).cloned().flatten(),
                });
            }
        }

        ctx.store.replace_customer_cohorts(ctx.run_id, &rows)?;
        Ok(StageReport::rows(rows.len() as u64))
    }
}
