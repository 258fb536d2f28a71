use super::SqlStore;
use crate::{
    cohort_stage::CustomerCohort,
    error::PipelineResult,
    retention_stage::{CohortRetention, CohortRetentionSegment},
};
use rusqlite::params;

impl SqlStore {
    // ── customer_cohort ───────────────────────────────────────────

    pub fn replace_customer_cohorts(
        &self,
        run_id: &str,
        rows: &[CustomerCohort],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM customer_cohort WHERE run_id = ?1",
            params![run_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO customer_cohort (
                     run_id, customer_unique_id, cohort_month, order_month,
                     month_index, segment_code
                 ) VALUES (?1,?2,?3,?4,?5,?6)",
            )?;
            for c in rows {
                stmt.execute(params![
                    run_id,
                    c.customer_unique_id,
                    c.cohort_month,
                    c.order_month,
                    c.month_index,
                    c.segment_code,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_customer_cohorts(&self, run_id: &str) -> PipelineResult<Vec<CustomerCohort>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, cohort_month, order_month, month_index, segment_code
             FROM customer_cohort WHERE run_id = ?1
             ORDER BY customer_unique_id ASC, order_month ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(CustomerCohort {
                    customer_unique_id: row.get(0)?,
                    cohort_month: row.get(1)?,
                    order_month: row.get(2)?,
                    month_index: row.get(3)?,
                    segment_code: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── cohort_retention ──────────────────────────────────────────

    pub fn replace_cohort_retention(
        &self,
        run_id: &str,
        rows: &[CohortRetention],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM cohort_retention WHERE run_id = ?1",
            params![run_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cohort_retention (
                     run_id, cohort_month, month_index, cohort_size,
                     retained_customers, retention_rate
                 ) VALUES (?1,?2,?3,?4,?5,?6)",
            )?;
            for r in rows {
                stmt.execute(params![
                    run_id,
                    r.cohort_month,
                    r.month_index,
                    r.cohort_size,
                    r.retained_customers,
                    r.retention_rate,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_cohort_retention(&self, run_id: &str) -> PipelineResult<Vec<CohortRetention>> {
        let mut stmt = self.conn().prepare(
            "SELECT cohort_month, month_index, cohort_size, retained_customers, retention_rate
             FROM cohort_retention WHERE run_id = ?1
             ORDER BY cohort_month ASC, month_index ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(CohortRetention {
                    cohort_month: row.get(0)?,
                    month_index: row.get(1)?,
                    cohort_size: row.get(2)?,
                    retained_customers: row.get(3)?,
                    retention_rate: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── cohort_retention_segment ──────────────────────────────────

    pub fn replace_cohort_retention_segment(
        &self,
        run_id: &str,
        rows: &[CohortRetentionSegment],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM cohort_retention_segment WHERE run_id = ?1",
            params![run_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cohort_retention_segment (
                     run_id, cohort_month, month_index, segment_code,
                     cohort_size, retained_customers, retention_rate
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
            )?;
            for r in rows {
                stmt.execute(params![
                    run_id,
                    r.cohort_month,
                    r.month_index,
                    r.segment_code,
                    r.cohort_size,
                    r.retained_customers,
                    r.retention_rate,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_cohort_retention_segment(
        &self,
        run_id: &str,
    ) -> PipelineResult<Vec<CohortRetentionSegment>> {
        let mut stmt = self.conn().prepare(
            "SELECT cohort_month, month_index, segment_code, cohort_size,
                    retained_customers, retention_rate
             FROM cohort_retention_segment WHERE run_id = ?1
             ORDER BY cohort_month ASC, month_index ASC, segment_code ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(CohortRetentionSegment {
                    cohort_month: row.get(0)?,
                    month_index: row.get(1)?,
                    segment_code: row.get(2)?,
                    cohort_size: row.get(3)?,
                    retained_customers: row.get(4)?,
                    retention_rate: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
