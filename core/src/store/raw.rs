use super::SqlStore;
use crate::{
    error::PipelineResult,
    raw::{
        ChurnScoreRecord, RawCustomerRecord, RawOrder, RawOrderItem, RawPayment, RawProduct,
        RawReview, SegmentRecord,
    },
};
use rusqlite::params;

impl SqlStore {
    // ── Raw ingestion ─────────────────────────────────────────────
    //
    // Bulk inserts run inside one transaction each. Loaders return rows in
    // a fixed key order so downstream grouping is input-order independent.

    pub fn insert_raw_customers(
        &self,
        run_id: &str,
        records: &[RawCustomerRecord],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_customers
                     (run_id, customer_id, customer_unique_id, zip_prefix, city, state)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for r in records {
                stmt.execute(params![
                    run_id,
                    r.customer_id,
                    r.customer_unique_id,
                    r.zip_prefix,
                    r.city,
                    r.state,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_raw_customers(&self, run_id: &str) -> PipelineResult<Vec<RawCustomerRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_id, customer_unique_id, zip_prefix, city, state
             FROM raw_customers WHERE run_id = ?1
             ORDER BY customer_unique_id ASC, customer_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(RawCustomerRecord {
                    customer_id: row.get(0)?,
                    customer_unique_id: row.get(1)?,
                    zip_prefix: row.get(2)?,
                    city: row.get(3)?,
                    state: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_raw_orders(&self, run_id: &str, orders: &[RawOrder]) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_orders
                     (run_id, order_id, customer_id, status, purchase_ts, delivered_ts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for o in orders {
                stmt.execute(params![
                    run_id,
                    o.order_id,
                    o.customer_id,
                    o.status,
                    o.purchase_ts,
                    o.delivered_ts,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Delivered-subset loader: status = 'delivered' AND purchase_ts present.
    pub fn load_delivered_orders(&self, run_id: &str) -> PipelineResult<Vec<RawOrder>> {
        let mut stmt = self.conn().prepare(
            "SELECT order_id, customer_id, status, purchase_ts, delivered_ts
             FROM raw_orders
             WHERE run_id = ?1 AND status = 'delivered' AND purchase_ts IS NOT NULL
             ORDER BY order_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(RawOrder {
                    order_id: row.get(0)?,
                    customer_id: row.get(1)?,
                    status: row.get(2)?,
                    purchase_ts: row.get(3)?,
                    delivered_ts: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_raw_order_items(
        &self,
        run_id: &str,
        items: &[RawOrderItem],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_order_items
                     (run_id, order_id, item_seq, product_id, price, freight_value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for i in items {
                stmt.execute(params![
                    run_id,
                    i.order_id,
                    i.item_seq,
                    i.product_id,
                    i.price,
                    i.freight_value,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_raw_order_items(&self, run_id: &str) -> PipelineResult<Vec<RawOrderItem>> {
        let mut stmt = self.conn().prepare(
            "SELECT order_id, item_seq, product_id, price, freight_value
             FROM raw_order_items WHERE run_id = ?1
             ORDER BY order_id ASC, item_seq ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(RawOrderItem {
                    order_id: row.get(0)?,
                    item_seq: row.get(1)?,
                    product_id: row.get(2)?,
                    price: row.get(3)?,
                    freight_value: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_raw_payments(&self, run_id: &str, payments: &[RawPayment]) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_payments
                     (run_id, order_id, payment_seq, payment_type, installments, payment_value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for p in payments {
                stmt.execute(params![
                    run_id,
                    p.order_id,
                    p.payment_seq,
                    p.payment_type,
                    p.installments,
                    p.payment_value,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_raw_payments(&self, run_id: &str) -> PipelineResult<Vec<RawPayment>> {
        let mut stmt = self.conn().prepare(
            "SELECT order_id, payment_seq, payment_type, installments, payment_value
             FROM raw_payments WHERE run_id = ?1
             ORDER BY order_id ASC, payment_seq ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(RawPayment {
                    order_id: row.get(0)?,
                    payment_seq: row.get(1)?,
                    payment_type: row.get(2)?,
                    installments: row.get(3)?,
                    payment_value: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_raw_reviews(&self, run_id: &str, reviews: &[RawReview]) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_reviews (run_id, review_id, order_id, review_score)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for r in reviews {
                stmt.execute(params![run_id, r.review_id, r.order_id, r.review_score])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_raw_reviews(&self, run_id: &str) -> PipelineResult<Vec<RawReview>> {
        let mut stmt = self.conn().prepare(
            "SELECT review_id, order_id, review_score
             FROM raw_reviews WHERE run_id = ?1
             ORDER BY order_id ASC, review_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(RawReview {
                    review_id: row.get(0)?,
                    order_id: row.get(1)?,
                    review_score: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_raw_products(&self, run_id: &str, products: &[RawProduct]) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_products (run_id, product_id, category_name)
                 VALUES (?1, ?2, ?3)",
            )?;
            for p in products {
                stmt.execute(params![run_id, p.product_id, p.category_name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_raw_products(&self, run_id: &str) -> PipelineResult<Vec<RawProduct>> {
        let mut stmt = self.conn().prepare(
            "SELECT product_id, category_name
             FROM raw_products WHERE run_id = ?1
             ORDER BY product_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(RawProduct {
                    product_id: row.get(0)?,
                    category_name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── External collaborator inputs ──────────────────────────────

    pub fn insert_churn_scores(
        &self,
        run_id: &str,
        scores: &[ChurnScoreRecord],
    ) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO customer_churn_scores (run_id, customer_unique_id, churn_risk)
                 VALUES (?1, ?2, ?3)",
            )?;
            for s in scores {
                stmt.execute(params![run_id, s.customer_unique_id, s.churn_risk])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_churn_scores(&self, run_id: &str) -> PipelineResult<Vec<ChurnScoreRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, churn_risk
             FROM customer_churn_scores WHERE run_id = ?1
             ORDER BY customer_unique_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(ChurnScoreRecord {
                    customer_unique_id: row.get(0)?,
                    churn_risk: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_segments(&self, run_id: &str, segments: &[SegmentRecord]) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO customer_segments
                     (run_id, customer_unique_id, segment_code, segment_name)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for s in segments {
                stmt.execute(params![
                    run_id,
                    s.customer_unique_id,
                    s.segment_code,
                    s.segment_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_segments(&self, run_id: &str) -> PipelineResult<Vec<SegmentRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT customer_unique_id, segment_code, segment_name
             FROM customer_segments WHERE run_id = ?1
             ORDER BY customer_unique_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(SegmentRecord {
                    customer_unique_id: row.get(0)?,
                    segment_code: row.get(1)?,
                    segment_name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
