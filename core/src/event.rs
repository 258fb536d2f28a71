//! Stage lifecycle events.
//!
//! RULE: Every stage transition is recorded in the stage_log table.
//! A failed run must surface which table failed and why from the log
//! alone, without re-running anything.

use crate::types::RunId;
use serde::{Deserialize, Serialize};

/// Every event emitted during a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        run_id: RunId,
    },
    StageStarted {
        stage: String,
        table: String,
    },
    StageCompleted {
        stage: String,
        table: String,
        rows_written: u64,
    },
    /// Non-fatal data-quality signal (identity tie, unattributable order,
    /// RFM customer with no churn score).
    DataQualityFlagged {
        stage: String,
        signal: String,
        detail: String,
    },
    HorizonComputed {
        max_purchase_ts: String,
        min_purchase_date: String,
        max_purchase_date: String,
    },
    StageFailed {
        stage: String,
        table: String,
        reason: String,
    },
    RunCompleted {
        run_id: RunId,
        tables_written: u64,
    },
}

impl PipelineEvent {
    /// Stable string name for the event_type column in stage_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::StageStarted { .. } => "stage_started",
            Self::StageCompleted { .. } => "stage_completed",
            Self::DataQualityFlagged { .. } => "data_quality_flagged",
            Self::HorizonComputed { .. } => "horizon_computed",
            Self::StageFailed { .. } => "stage_failed",
            Self::RunCompleted { .. } => "run_completed",
        }
    }
}

/// The stage log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub stage: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized PipelineEvent
}
