use super::SqlStore;
use crate::{error::PipelineResult, identity_stage::CanonicalCustomer};
use rusqlite::{params, OptionalExtension};

impl SqlStore {
    /// Drop-and-rebuild the canonical_customer table for a run.
    pub fn replace_canonical_customers(
        &self,
        run_id: &str,
        rows: &[CanonicalCustomer],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM canonical_customer WHERE run_id = ?1",
            params![run_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO canonical_customer (
                     run_id, customer_unique_id, city, state, zip_prefix,
                     first_order_ts, last_order_ts, delivered_orders, tenure_days
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            )?;
            for c in rows {
                stmt.execute(params![
                    run_id,
                    c.customer_unique_id,
                    c.city,
                    c.state,
                    c.zip_prefix,
                    c.first_order_ts,
                    c.last_order_ts,
                    c.delivered_orders,
                    c.tenure_days,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_canonical_customers(&self, run_id: &str) -> PipelineResult<Vec<CanonicalCustomer>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, city, state, zip_prefix,
                    first_order_ts, last_order_ts, delivered_orders, tenure_days
             FROM canonical_customer WHERE run_id = ?1
             ORDER BY customer_unique_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(CanonicalCustomer {
                    customer_unique_id: row.get(0)?,
                    city: row.get(1)?,
                    state: row.get(2)?,
                    zip_prefix: row.get(3)?,
                    first_order_ts: row.get(4)?,
                    last_order_ts: row.get(5)?,
                    delivered_orders: row.get(6)?,
                    tenure_days: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_canonical_customer(
        &self,
        run_id: &str,
        customer_unique_id: &str,
    ) -> PipelineResult<Option<CanonicalCustomer>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, city, state, zip_prefix,
                    first_order_ts, last_order_ts, delivered_orders, tenure_days
             FROM canonical_customer
             WHERE run_id = ?1 AND customer_unique_id = ?2",
        )?;
        let row = stmt
            .query_row(params![run_id, customer_unique_id], |row| {
                Ok(CanonicalCustomer {
                    customer_unique_id: row.get(0)?,
                    city: row.get(1)?,
                    state: row.get(2)?,
                    zip_prefix: row.get(3)?,
                    first_order_ts: row.get(4)?,
                    last_order_ts: row.get(5)?,
                    delivered_orders: row.get(6)?,
                    tenure_days: row.get(7)?,
                })
            })
            .optional()?;
        Ok(row)
    }
}
