//! The pipeline engine — the heart of the analytics build.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   Fact stages:
//!     1. identity       -> canonical_customer
//!     2. order_facts    -> order_fact
//!   Dataset horizon computed HERE, exactly once, from order_fact.
//!   Feature stages (all receive that one horizon value):
//!     3. date_dim       -> date_dim
//!     4. rfm            -> customer_rfm
//!     5. time_features  -> customer_time_features
//!     6. cohort         -> customer_cohort
//!     7. retention      -> cohort_retention, cohort_retention_segment
//!     8. priority       -> prioritized_customer
//!
//! RULES:
//!   - A stage does not begin until the previous stage's table is committed.
//!   - Required inputs are checked before any stage runs; an absent or
//!     empty required table aborts the run with nothing published.
//!   - Every output table is rebuilt inside one transaction, so a retried
//!     run never sees partial state.
//!   - No stage recomputes the horizon. Recency and the rolling windows
//!     agree because they are handed the same value.
//!   - All stage transitions are recorded in the stage log.

use crate::{
    cohort_stage::CohortStage,
    config::PipelineConfig,
    date_dim_stage::DateDimStage,
    error::{PipelineError, PipelineResult},
    event::{PipelineEvent, StageLogEntry},
    horizon::DatasetHorizon,
    identity_stage::IdentityStage,
    order_facts_stage::OrderFactsStage,
    priority_stage::PriorityStage,
    retention_stage::RetentionStage,
    rfm_stage::RfmStage,
    stage::{FactStage, FeatureStage, StageContext, StageReport},
    store::SqlStore,
    time_features_stage::TimeFeaturesStage,
    types::{fmt_ts, RunId},
};

/// End-of-run row counts, returned for the runner to print.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub horizon: DatasetHorizon,
    pub canonical_customers: i64,
    pub order_facts: i64,
    pub rfm_customers: i64,
    pub time_feature_customers: i64,
    pub cohort_rows: i64,
    pub retention_rows: i64,
    pub retention_segment_rows: i64,
    pub prioritized_customers: i64,
    pub date_dim_rows: i64,
    pub quality_flags: u64,
}

pub struct PipelineEngine {
    pub run_id: RunId,
    pub config: PipelineConfig,
    pub store: SqlStore,
    fact_stages: Vec<Box<dyn FactStage>>,
    feature_stages: Vec<Box<dyn FeatureStage>>,
}

impl PipelineEngine {
    pub fn new(run_id: RunId, config: PipelineConfig, store: SqlStore) -> Self {
        Self {
            run_id,
            config,
            store,
            fact_stages: Vec::new(),
            feature_stages: Vec::new(),
        }
    }

    /// Build a fully wired engine with all stages registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId, config: PipelineConfig, store: SqlStore) -> Self {
        let mut engine = Self::new(run_id, config, store);

        // EXECUTION ORDER — fixed, documented, never reordered.
        engine.register_fact(Box::new(IdentityStage::new()));
        engine.register_fact(Box::new(OrderFactsStage::new()));

        engine.register_feature(Box::new(DateDimStage::new()));
        engine.register_feature(Box::new(RfmStage::new()));
        engine.register_feature(Box::new(TimeFeaturesStage::new()));
        engine.register_feature(Box::new(CohortStage::new()));
        engine.register_feature(Box::new(RetentionStage::new()));
        engine.register_feature(Box::new(PriorityStage::new()));
        engine
    }

    /// In-memory engine with migrations applied and a run row inserted.
    /// Used by tests.
    pub fn build_test(run_id: &str) -> PipelineResult<Self> {
        let store = SqlStore::in_memory()?;
        store.migrate()?;
        store.insert_run(run_id, 0, "0.1.0-test")?;
        Ok(Self::build(
            run_id.to_string(),
            PipelineConfig::default_test(),
            store,
        ))
    }

    pub fn register_fact(&mut self, stage: Box<dyn FactStage>) {
        self.fact_stages.push(stage);
    }

    pub fn register_feature(&mut self, stage: Box<dyn FeatureStage>) {
        self.feature_stages.push(stage);
    }

    /// Execute the full pipeline. This is the one entry point.
    pub fn run(&mut self) -> PipelineResult<RunSummary> {
        self.check_required_inputs()?;

        append_event(
            &self.store,
            &self.run_id,
            "engine",
            &PipelineEvent::RunStarted {
                run_id: self.run_id.clone(),
            },
        )?;

        let mut quality_flags: u64 = 0;

        for stage in self.fact_stages.iter_mut() {
            let ctx = StageContext {
                run_id: &self.run_id,
                store: &self.store,
                config: &self.config,
            };
            let name = stage.name();
            let table = stage.output_table();

            append_event(
                &self.store,
                &self.run_id,
                name,
                &PipelineEvent::StageStarted {
                    stage: name.to_string(),
                    table: table.to_string(),
                },
            )?;

            let report = finish_stage(&self.store, &self.run_id, name, table, stage.run(&ctx))?;
            quality_flags += report.quality_flags.len() as u64;
        }

        // The single horizon computation of the whole run.
        let horizon = self
            .store
            .dataset_horizon(&self.run_id)?
            .ok_or(PipelineError::EmptyInput { table: "order_fact" })?;

        append_event(
            &self.store,
            &self.run_id,
            "engine",
            &PipelineEvent::HorizonComputed {
                max_purchase_ts: fmt_ts(horizon.max_purchase_ts),
                min_purchase_date: horizon.min_purchase_date.to_string(),
                max_purchase_date: horizon.max_purchase_date.to_string(),
            },
        )?;
        log::info!(
            "engine horizon={} range={}..{}",
            fmt_ts(horizon.max_purchase_ts),
            horizon.min_purchase_date,
            horizon.max_purchase_date,
        );

        for stage in self.feature_stages.iter_mut() {
            let ctx = StageContext {
                run_id: &self.run_id,
                store: &self.store,
                config: &self.config,
            };
            let name = stage.name();
            let table = stage.output_table();

            append_event(
                &self.store,
                &self.run_id,
                name,
                &PipelineEvent::StageStarted {
                    stage: name.to_string(),
                    table: table.to_string(),
                },
            )?;

            let report = finish_stage(
                &self.store,
                &self.run_id,
                name,
                table,
                stage.run(&ctx, &horizon),
            )?;
            quality_flags += report.quality_flags.len() as u64;
        }

        let tables_written = (self.fact_stages.len() + self.feature_stages.len()) as u64;
        append_event(
            &self.store,
            &self.run_id,
            "engine",
            &PipelineEvent::RunCompleted {
                run_id: self.run_id.clone(),
                tables_written,
            },
        )?;

        Ok(RunSummary {
            horizon,
            canonical_customers: self.store.table_count("canonical_customer", &self.run_id)?,
            order_facts: self.store.table_count("order_fact", &self.run_id)?,
            rfm_customers: self.store.table_count("customer_rfm", &self.run_id)?,
            time_feature_customers: self
                .store
                .table_count("customer_time_features", &self.run_id)?,
            cohort_rows: self.store.table_count("customer_cohort", &self.run_id)?,
            retention_rows: self.store.table_count("cohort_retention", &self.run_id)?,
            retention_segment_rows: self
                .store
                .table_count("cohort_retention_segment", &self.run_id)?,
            prioritized_customers: self.store.table_count("prioritized_customer", &self.run_id)?,
            date_dim_rows: self.store.table_count("date_dim", &self.run_id)?,
            quality_flags,
        })
    }

    /// Fail fast when a required input is absent or empty. Downstream
    /// correctness depends on input completeness, so a hole here is fatal
    /// before anything is published.
    fn check_required_inputs(&self) -> PipelineResult<()> {
        const REQUIRED: [&str; 3] = ["raw_customers", "raw_orders", "customer_churn_scores"];

        for table in REQUIRED {
            if !self.store.table_exists(table)? {
                return Err(PipelineError::MissingInput { table });
            }
            if self.store.table_count(table, &self.run_id)? == 0 {
                return Err(PipelineError::EmptyInput { table });
            }
        }
        Ok(())
    }
}

fn append_event(
    store: &SqlStore,
    run_id: &str,
    stage: &str,
    event: &PipelineEvent,
) -> PipelineResult<()> {
    let entry = StageLogEntry {
        id: None,
        run_id: run_id.to_string(),
        stage: stage.to_string(),
        event_type: event.type_name().to_string(),
        payload: serde_json::to_string(event)?,
    };
    store.append_stage_event(&entry)
}

/// Record the outcome of one stage: completion with row count and quality
/// flags on success, a stage_failed entry plus a wrapped error on failure.
fn finish_stage(
    store: &SqlStore,
    run_id: &str,
    stage: &'static str,
    table: &'static str,
    result: PipelineResult<StageReport>,
) -> PipelineResult<StageReport> {
    match result {
        Ok(report) => {
            for (signal, detail) in &report.quality_flags {
                append_event(
                    store,
                    run_id,
                    stage,
                    &PipelineEvent::DataQualityFlagged {
                        stage: stage.to_string(),
                        signal: signal.clone(),
                        detail: detail.clone(),
                    },
                )?;
            }
            append_event(
                store,
                run_id,
                stage,
                &PipelineEvent::StageCompleted {
                    stage: stage.to_string(),
                    table: table.to_string(),
                    rows_written: report.rows_written,
                },
            )?;
            log::info!(
                "stage={stage} table={table} rows={} flags={}",
                report.rows_written,
                report.quality_flags.len(),
            );
            Ok(report)
        }
        Err(err) => {
            // Best effort: the log entry must not mask the original error.
            let _ = append_event(
                store,
                run_id,
                stage,
                &PipelineEvent::StageFailed {
                    stage: stage.to_string(),
                    table: table.to_string(),
                    reason: err.to_string(),
                },
            );
            log::error!("stage={stage} table={table} failed: {err}");
            Err(PipelineError::StageFailed {
                stage,
                table,
                source: Box::new(err),
            })
        }
    }
}
