use super::SqlStore;
use crate::{error::PipelineResult, priority_stage::PrioritizedCustomer};
use rusqlite::{params, OptionalExtension};

impl SqlStore {
    pub fn replace_prioritized_customers(
        &self,
        run_id: &str,
        rows: &[PrioritizedCustomer],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM prioritized_customer WHERE run_id = ?1",
            params![run_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO prioritized_customer (
                     run_id, customer_unique_id, churn_risk, monetary, value_at_risk,
                     churn_band, value_band, priority_band, recommended_action
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            )?;
            for p in rows {
                stmt.execute(params![
                    run_id,
                    p.customer_unique_id,
                    p.churn_risk,
                    p.monetary,
                    p.value_at_risk,
                    p.churn_band,
                    p.value_band,
                    p.priority_band,
                    p.recommended_action,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_prioritized_customers(
        &self,
        run_id: &str,
    ) -> PipelineResult<Vec<PrioritizedCustomer>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, churn_risk, monetary, value_at_risk,
                    churn_band, value_band, priority_band, recommended_action
             FROM prioritized_customer WHERE run_id = ?1
             ORDER BY customer_unique_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(PrioritizedCustomer {
                    customer_unique_id: row.get(0)?,
                    churn_risk: row.get(1)?,
                    monetary: row.get(2)?,
                    value_at_risk: row.get(3)?,
                    churn_band: row.get(4)?,
                    value_band: row.get(5)?,
                    priority_band: row.get(6)?,
                    recommended_action: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_prioritized_customer(
        &self,
        run_id: &str,
        customer_unique_id: &str,
    ) -> PipelineResult<Option<PrioritizedCustomer>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, churn_risk, monetary, value_at_risk,
                    churn_band, value_band, priority_band, recommended_action
             FROM prioritized_customer
             WHERE run_id = ?1 AND customer_unique_id = ?2",
        )?;
        let row = stmt
            .query_row(params![run_id, customer_unique_id], |row| {
                Ok(PrioritizedCustomer {
                    customer_unique_id: row.get(0)?,
                    churn_risk: row.get(1)?,
                    monetary: row.get(2)?,
                    value_at_risk: row.get(3)?,
                    churn_band: row.get(4)?,
                    value_band: row.get(5)?,
                    priority_band: row.get(6)?,
                    recommended_action: row.get(7)?,
                })
            })
            .optional()?;
        Ok(row)
    }
}
