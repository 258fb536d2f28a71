use super::SqlStore;
use crate::{error::PipelineResult, order_facts_stage::OrderFact};
use rusqlite::{params, OptionalExtension};

impl SqlStore {
    /// Drop-and-rebuild the order_fact table for a run.
    pub fn replace_order_facts(&self, run_id: &str, rows: &[OrderFact]) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM order_fact WHERE run_id = ?1", params![run_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO order_fact (
                     run_id, order_id, customer_unique_id, purchase_ts,
                     items_revenue, freight_value, gross_order_value,
                     item_count, distinct_products, distinct_categories,
                     payment_total, payment_methods, max_installments,
                     review_score, segment_code, segment_name
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
            )?;
            for f in rows {
                stmt.execute(params![
                    run_id,
                    f.order_id,
                    f.customer_unique_id,
                    f.purchase_ts,
                    f.items_revenue,
                    f.freight_value,
                    f.gross_order_value,
                    f.item_count,
                    f.distinct_products,
                    f.distinct_categories,
                    f.payment_total,
                    f.payment_methods,
                    f.max_installments,
                    f.review_score,
                    f.segment_code,
                    f.segment_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Order facts in (customer, purchase_ts, order_id) order — the fixed
    /// grouping order every feature stage relies on.
    pub fn load_order_facts(&self, run_id: &str) -> PipelineResult<Vec<OrderFact>> {
        let mut stmt = self.conn().prepare(
            "SELECT order_id, customer_unique_id, purchase_ts,
                    items_revenue, freight_value, gross_order_value,
                    item_count, distinct_products, distinct_categories,
                    payment_total, payment_methods, max_installments,
                    review_score, segment_code, segment_name
             FROM order_fact WHERE run_id = ?1
             ORDER BY customer_unique_id ASC, purchase_ts ASC, order_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(OrderFact {
                    order_id: row.get(0)?,
                    customer_unique_id: row.get(1)?,
                    purchase_ts: row.get(2)?,
                    items_revenue: row.get(3)?,
                    freight_value: row.get(4)?,
                    gross_order_value: row.get(5)?,
                    item_count: row.get(6)?,
                    distinct_products: row.get(7)?,
                    distinct_categories: row.get(8)?,
                    payment_total: row.get(9)?,
                    payment_methods: row.get(10)?,
                    max_installments: row.get(11)?,
                    review_score: row.get(12)?,
                    segment_code: row.get(13)?,
                    segment_name: row.get(14)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_order_fact(&self, run_id: &str, order_id: &str) -> PipelineResult<Option<OrderFact>> {
        let mut stmt = self.conn().prepare(
            "SELECT order_id, customer_unique_id, purchase_ts,
                    items_revenue, freight_value, gross_order_value,
                    item_count, distinct_products, distinct_categories,
                    payment_total, payment_methods, max_installments,
                    review_score, segment_code, segment_name
             FROM order_fact WHERE run_id = ?1 AND order_id = ?2",
        )?;
        let row = stmt
            .query_row(params![run_id, order_id], |row| {
                Ok(OrderFact {
                    order_id: row.get(0)?,
                    customer_unique_id: row.get(1)?,
                    purchase_ts: row.get(2)?,
                    items_revenue: row.get(3)?,
                    freight_value: row.get(4)?,
                    gross_order_value: row.get(5)?,
                    item_count: row.get(6)?,
                    distinct_products: row.get(7)?,
                    distinct_categories: row.get(8)?,
                    payment_total: row.get(9)?,
                    payment_methods: row.get(10)?,
                    max_installments: row.get(11)?,
                    review_score: row.get(12)?,
                    segment_code: row.get(13)?,
                    segment_name: row.get(14)?,
                })
            })
            .optional()?;
        Ok(row)
    }
}
