//! Stage traits and the per-stage execution context.
//!
//! RULE: Every pipeline stage implements exactly one of the two traits.
//! Fact stages run first and need no horizon. Feature stages run after the
//! engine has computed the dataset horizon from the committed fact tables,
//! and receive that one horizon value as a parameter — they cannot compute
//! their own. Execution order is fixed and documented in engine.rs.

use crate::{config::PipelineConfig, error::PipelineResult, horizon::DatasetHorizon, store::SqlStore};

/// Everything a stage may touch while running.
pub struct StageContext<'a> {
    pub run_id: &'a str,
    pub store: &'a SqlStore,
    pub config: &'a PipelineConfig,
}

/// What a stage reports back to the engine.
#[derive(Debug, Default)]
pub struct StageReport {
    pub rows_written: u64,
    /// Non-fatal data-quality signals, appended to the stage log as
    /// (signal, detail) pairs.
    pub quality_flags: Vec<(String, String)>,
}

impl StageReport {
    pub fn rows(rows_written: u64) -> Self {
        Self {
            rows_written,
            quality_flags: Vec::new(),
        }
    }

    pub fn flag(&mut self, signal: &str, detail: impl Into<String>) {
        self.quality_flags.push((signal.to_string(), detail.into()));
    }
}

/// A stage that builds fact-grain tables from the raw extract.
pub trait FactStage: Send {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// The table this stage rebuilds.
    fn output_table(&self) -> &'static str;

    fn run(&mut self, ctx: &StageContext<'_>) -> PipelineResult<StageReport>;
}

/// A stage that derives customer-centric tables relative to the shared
/// dataset horizon.
pub trait FeatureStage: Send {
    fn name(&self) -> &'static str;

    fn output_table(&self) -> &'static str;

    fn run(
        &mut self,
        ctx: &StageContext<'_>,
        horizon: &DatasetHorizon,
    ) -> PipelineResult<StageReport>;
}
