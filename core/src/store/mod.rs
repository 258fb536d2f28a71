//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Stages call store methods — they never execute SQL directly.
//! Every output table is replaced inside one transaction, so a failed
//! stage never publishes a partial table.

use crate::{
    error::{PipelineError, PipelineResult},
    event::StageLogEntry,
    horizon::DatasetHorizon,
    types::parse_ts,
};
use rusqlite::{params, Connection};

mod cohort;
mod date_dim;
mod features;
mod identity;
mod order_facts;
mod priority;
mod raw;

pub struct SqlStore {
    conn: Connection,
}

impl SqlStore {
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_raw_inputs.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_canonical_customer.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_order_fact.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_customer_rfm.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/006_time_features.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/007_cohorts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/008_prioritized_customer.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/009_date_dim.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, 0i64],
        )?;
        Ok(())
    }

    // ── Stage log ──────────────────────────────────────────────

    pub fn append_stage_event(&self, entry: &StageLogEntry) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO stage_log (run_id, stage, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.run_id, entry.stage, entry.event_type, entry.payload, 0i64],
        )?;
        Ok(())
    }

    pub fn stage_events(&self, run_id: &str) -> PipelineResult<Vec<StageLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, stage, event_type, payload
             FROM stage_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(StageLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    stage: row.get(2)?,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Horizon ────────────────────────────────────────────────

    /// The dataset horizon over the committed order_fact table.
    /// Returns None when no delivered order facts exist.
    pub fn dataset_horizon(&self, run_id: &str) -> PipelineResult<Option<DatasetHorizon>> {
        let bounds: (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(purchase_ts), MAX(purchase_ts) FROM order_fact WHERE run_id = ?1",
            params![run_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (min_s, max_s) = match bounds {
            (Some(min_s), Some(max_s)) => (min_s, max_s),
            _ => return Ok(None),
        };

        let min_ts = parse_ts(&min_s).ok_or_else(|| PipelineError::BadTimestamp {
            table: "order_fact",
            value: min_s.clone(),
        })?;
        let max_ts = parse_ts(&max_s).ok_or_else(|| PipelineError::BadTimestamp {
            table: "order_fact",
            value: max_s.clone(),
        })?;

        Ok(Some(DatasetHorizon {
            max_purchase_ts: max_ts,
            min_purchase_date: min_ts.date(),
            max_purchase_date: max_ts.date(),
        }))
    }

    // ── Generic helpers ────────────────────────────────────────

    pub(crate) fn count_rows(&self, table: &str, run_id: &str) -> PipelineResult<i64> {
        // Table names come from a fixed internal list, never from callers.
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE run_id = ?1");
        self.conn
            .query_row(&sql, params![run_id], |row| row.get(0))
            .map_err(Into::into)
    }

    pub fn table_count(&self, table: &'static str, run_id: &str) -> PipelineResult<i64> {
        self.count_rows(table, run_id)
    }

    pub fn table_exists(&self, table: &str) -> PipelineResult<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
