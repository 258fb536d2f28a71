use super::SqlStore;
use crate::{
    error::PipelineResult, rfm_stage::CustomerRfm, time_features_stage::CustomerTimeFeatures,
};
use rusqlite::{params, OptionalExtension};

impl SqlStore {
    // ── customer_rfm ──────────────────────────────────────────────

    pub fn replace_customer_rfm(&self, run_id: &str, rows: &[CustomerRfm]) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM customer_rfm WHERE run_id = ?1", params![run_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO customer_rfm (
                     run_id, customer_unique_id, recency_days, frequency, monetary,
                     avg_order_value, avg_items_per_order, avg_category_diversity,
                     first_order_ts, last_order_ts, tenure_days, avg_days_between_orders
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            )?;
            for r in rows {
                stmt.execute(params![
                    run_id,
                    r.customer_unique_id,
                    r.recency_days,
                    r.frequency,
                    r.monetary,
                    r.avg_order_value,
                    r.avg_items_per_order,
                    r.avg_category_diversity,
                    r.first_order_ts,
                    r.last_order_ts,
                    r.tenure_days,
                    r.avg_days_between_orders,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_customer_rfm(&self, run_id: &str) -> PipelineResult<Vec<CustomerRfm>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, recency_days, frequency, monetary,
                    avg_order_value, avg_items_per_order, avg_category_diversity,
                    first_order_ts, last_order_ts, tenure_days, avg_days_between_orders
             FROM customer_rfm WHERE run_id = ?1
             ORDER BY customer_unique_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(CustomerRfm {
                    customer_unique_id: row.get(0)?,
                    recency_days: row.get(1)?,
                    frequency: row.get(2)?,
                    monetary: row.get(3)?,
                    avg_order_value: row.get(4)?,
                    avg_items_per_order: row.get(5)?,
                    avg_category_diversity: row.get(6)?,
                    first_order_ts: row.get(7)?,
                    last_order_ts: row.get(8)?,
                    tenure_days: row.get(9)?,
                    avg_days_between_orders: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_customer_rfm(
        &self,
        run_id: &str,
        customer_unique_id: &str,
    ) -> PipelineResult<Option<CustomerRfm>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, recency_days, frequency, monetary,
                    avg_order_value, avg_items_per_order, avg_category_diversity,
                    first_order_ts, last_order_ts, tenure_days, avg_days_between_orders
             FROM customer_rfm WHERE run_id = ?1 AND customer_unique_id = ?2",
        )?;
        let row = stmt
            .query_row(params![run_id, customer_unique_id], |row| {
                Ok(CustomerRfm {
                    customer_unique_id: row.get(0)?,
                    recency_days: row.get(1)?,
                    frequency: row.get(2)?,
                    monetary: row.get(3)?,
                    avg_order_value: row.get(4)?,
                    avg_items_per_order: row.get(5)?,
                    avg_category_diversity: row.get(6)?,
                    first_order_ts: row.get(7)?,
                    last_order_ts: row.get(8)?,
                    tenure_days: row.get(9)?,
                    avg_days_between_orders: row.get(10)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    // ── customer_time_features ────────────────────────────────────

    pub fn replace_time_features(
        &self,
        run_id: &str,
        rows: &[CustomerTimeFeatures],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM customer_time_features WHERE run_id = ?1",
            params![run_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO customer_time_features (
                     run_id, customer_unique_id,
                     spend_30d, spend_90d, spend_180d,
                     orders_30d, orders_90d, orders_180d,
                     lifetime_orders, lifetime_spend,
                     avg_order_value_180d, recent_order_ratio, recent_spend_ratio
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            )?;
            for t in rows {
                stmt.execute(params![
                    run_id,
                    t.customer_unique_id,
                    t.spend_30d,
                    t.spend_90d,
                    t.spend_180d,
                    t.orders_30d,
                    t.orders_90d,
                    t.orders_180d,
                    t.lifetime_orders,
                    t.lifetime_spend,
                    t.avg_order_value_180d,
                    t.recent_order_ratio,
                    t.recent_spend_ratio,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_time_features(&self, run_id: &str) -> PipelineResult<Vec<CustomerTimeFeatures>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id,
                    spend_30d, spend_90d, spend_180d,
                    orders_30d, orders_90d, orders_180d,
                    lifetime_orders, lifetime_spend,
                    avg_order_value_180d, recent_order_ratio, recent_spend_ratio
             FROM customer_time_features WHERE run_id = ?1
             ORDER BY customer_unique_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(CustomerTimeFeatures {
                    customer_unique_id: row.get(0)?,
                    spend_30d: row.get(1)?,
                    spend_90d: row.get(2)?,
                    spend_180d: row.get(3)?,
                    orders_30d: row.get(4)?,
                    orders_90d: row.get(5)?,
                    orders_180d: row.get(6)?,
                    lifetime_orders: row.get(7)?,
                    lifetime_spend: row.get(8)?,
                    avg_order_value_180d: row.get(9)?,
                    recent_order_ratio: row.get(10)?,
                    recent_spend_ratio: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_time_features(
        &self,
        run_id: &str,
        customer_unique_id: &str,
    ) -> PipelineResult<Option<CustomerTimeFeatures>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id,
                    spend_30d, spend_90d, spend_180d,
                    orders_30d, orders_90d, orders_180d,
                    lifetime_orders, lifetime_spend,
                    avg_order_value_180d, recent_order_ratio, recent_spend_ratio
             FROM customer_time_features WHERE run_id = ?1 AND customer_unique_id = ?2",
        )?;
        let row = stmt
            .query_row(params![run_id, customer_unique_id], |row| {
                Ok(CustomerTimeFeatures {
                    customer_unique_id: row.get(0)?,
                    spend_30d: row.get(1)?,
                    spend_90d: row.get(2)?,
                    spend_180d: row.get(3)?,
                    orders_30d: row.get(4)?,
                    orders_90d: row.get(5)?,
                    orders_180d: row.get(6)?,
                    lifetime_orders: row.get(7)?,
                    lifetime_spend: row.get(8)?,
                    avg_order_value_180d: row.get(9)?,
                    recent_order_ratio: row.get(10)?,
                    recent_spend_ratio: row.get(11)?,
                })
            })
            .optional()?;
        Ok(row)
    }
}
