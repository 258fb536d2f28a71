//! Date dimension stage — one row per calendar day in the observed
//! purchase range. Join dimension only; carries no analytics.

use crate::{
    error::PipelineResult,
    horizon::DatasetHorizon,
    stage::{FeatureStage, StageContext, StageReport},
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateDimRow {
    pub date_key: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub quarter: u32,
    /// ISO day of week, 1 = Monday.
    pub day_of_week: u32,
    pub is_weekend: bool,
    /// Fiscal year labelled by its starting calendar year.
    pub fiscal_year: i32,
    pub fiscal_quarter: u32,
}

pub fn date_dim_row(date: NaiveDate, fiscal_start_month: u32) -> DateDimRow {
    let month = date.month();
    let day_of_week = date.weekday().number_from_monday();
    let fiscal_year = if month >= fiscal_start_month {
        date.year()
    } else {
        date.year() - 1
    };
    let months_into_fy = (month + 12 - fiscal_start_month) % 12;

    DateDimRow {
        date_key: date.format("%Y-%m-%d").to_string(),
        year: date.year(),
        month,
        day: date.day(),
        quarter: (month - 1) / 3 + 1,
        day_of_week,
        is_weekend: day_of_week >= 6,
        fiscal_year,
        fiscal_quarter: months_into_fy / 3 + 1,
    }
}

pub struct DateDimStage;

impl DateDimStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateDimStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStage for DateDimStage {
    fn name(&self) -> &'static str {
        "date_dim"
    }

    fn output_table(&self) -> &'static str {
        "date_dim"
    }

    fn run(
        &mut self,
        ctx: &StageContext<'_>,
        horizon: &DatasetHorizon,
    ) -> PipelineResult<StageReport> {
        let mut rows = Vec::new();
        let mut date = horizon.min_purchase_date;
        while date <= horizon.max_purchase_date {
            rows.push(date_dim_row(date, ctx.config.fiscal_year_start_month));
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        ctx.store.replace_date_dim(ctx.run_id, &rows)?;
        Ok(StageReport::rows(rows.len() as u64))
    }
}
