//! Retention stage — cohort retention rates, overall and per segment.
//!
//! cohort_size counts distinct customers in the month_index = 0 slice;
//! retained_customers counts distinct customers active at a month_index.
//! The two are divided, 4-decimal rounded, and NEVER summed across
//! month_index values — each index is its own distinct-customer universe.
//! A zero or absent cohort_size yields a NULL rate, not 0.

use crate::{
    cohort_stage::CustomerCohort,
    error::PipelineResult,
    horizon::DatasetHorizon,
    stage::{FeatureStage, StageContext, StageReport},
    types::round4,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRetention {
    pub cohort_month: String,
    pub month_index: i64,
    pub cohort_size: i64,
    pub retained_customers: i64,
    pub retention_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRetentionSegment {
    pub cohort_month: String,
    pub month_index: i64,
    pub segment_code: String,
    pub cohort_size: i64,
    pub retained_customers: i64,
    pub retention_rate: Option<f64>,
}

fn rate(retained: i64, size: i64) -> Option<f64> {
    if size > 0 {
        Some(round4(retained as f64 / size as f64))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::rate;

    /// Division by a zero or absent cohort size yields NULL, never 0.
    #[test]
    fn zero_cohort_size_gives_null_rate() {
        assert_eq!(rate(0, 0), None);
        assert_eq!(rate(3, 0), None);
        assert_eq!(rate(1, 3), Some(0.3333));
        assert_eq!(rate(3, 3), Some(1.0));
    }
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct RetentionStage;

impl RetentionStage {
    pub fn new() -> Self {
        Self
    }

    fn overall(cohorts: &[CustomerCohort]) -> Vec<CohortRetention> {
        let mut sizes: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut retained: BTreeMap<(&str, i64), BTreeSet<&str>> = BTreeMap::new();

        for row in cohorts {
            if row.month_index == 0 {
                sizes
                    .entry(row.cohort_month.as_str())
                    .or_default()
                    .insert(row.customer_unique_id.as_str());
            }
            retained
                .entry((row.cohort_month.as_str(), row.month_index))
                .or_default()
                .insert(row.customer_unique_id.as_str());
        }

        retained
            .iter()
            .map(|((cohort_month, month_index), customers)| {
                let size = sizes.get(cohort_month).map_or(0, |s| s.len() as i64);
                let retained_customers = customers.len() as i64;
                CohortRetention {
                    cohort_month: cohort_month.to_string(),
                    month_index: *month_index,
                    cohort_size: size,
                    retained_customers,
                    retention_rate: rate(retained_customers, size),
                }
            })
            .collect()
    }

    /// Segmented variant. Sizes come from the month_index = 0 slice per
    /// (cohort, segment): customers with no segment label never enter, even
    /// when active in later months.
    fn segmented(cohorts: &[CustomerCohort]) -> Vec<CohortRetentionSegment> {
        let mut sizes: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
        let mut retained: BTreeMap<(&str, i64, &str), BTreeSet<&str>> = BTreeMap::new();

        for row in cohorts {
            let Some(segment) = row.segment_code.as_deref() else {
                continue;
            };
            if row.month_index == 0 {
                sizes
                    .entry((row.cohort_month.as_str(), segment))
                    .or_default()
                    .insert(row.customer_unique_id.as_str());
            }
            retained
                .entry((row.cohort_month.as_str(), row.month_index, segment))
                .or_default()
                .insert(row.customer_unique_id.as_str());
        }

        retained
            .iter()
            .map(|((cohort_month, month_index, segment), customers)| {
                let size = sizes
                    .get(&(*cohort_month, *segment))
                    .map_or(0, |s| s.len() as i64);
                let retained_customers = customers.len() as i64;
                CohortRetentionSegment {
                    cohort_month: cohort_month.to_string(),
                    month_index: *month_index,
                    segment_code: segment.to_string(),
                    cohort_size: size,
                    retained_customers,
                    retention_rate: rate(retained_customers, size),
                }
            })
            .collect()
    }
}

impl Default for RetentionStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStage for RetentionStage {
    fn name(&self) -> &'static str {
        "retention"
    }

    fn output_table(&self) -> &'static str {
        "cohort_retention"
    }

    fn run(
        &mut self,
        ctx: &StageContext<'_>,
        _horizon: &DatasetHorizon,
    ) -> PipelineResult<StageReport> {
        let cohorts = ctx.store.load_customer_cohorts(ctx.run_id)?;

        let overall = Self::overall(&cohorts);
        let segmented = Self::segmented(&cohorts);

        ctx.store.replace_cohort_retention(ctx.run_id, &overall)?;
        ctx.store
            .replace_cohort_retention_segment(ctx.run_id, &segmented)?;

        log::info!(
            "stage=retention overall_rows={} segment_rows={}",
            overall.len(),
            segmented.len(),
        );
        Ok(StageReport::rows((overall.len() + segmented.len()) as u64))
    }
}
