//! Order fact builder — one row per delivered order.
//!
//! This stage:
//!   1. Aggregates each child table (items, payments, reviews) to order
//!      grain into its own keyed accumulator
//!   2. Merges the accumulators 1:1 onto the delivered order list
//!   3. Left-joins the external segment labels per customer
//!
//! Child rows are NEVER joined at their own grain — aggregate first, merge
//! second. Orders with no rows in a child table keep zero financial/count
//! fields; a missing review stays NULL (absence is meaningful).

use crate::{
    error::PipelineResult,
    stage::{FactStage, StageContext, StageReport},
    types::{round2, round4, CustomerUniqueId, OrderId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFact {
    pub order_id: OrderId,
    pub customer_unique_id: CustomerUniqueId,
    pub purchase_ts: String,
    pub items_revenue: f64,
    pub freight_value: f64,
    pub gross_order_value: f64,
    pub item_count: i64,
    pub distinct_products: i64,
    pub distinct_categories: i64,
    pub payment_total: f64,
    pub payment_methods: i64,
    pub max_installments: i64,
    pub review_score: Option<f64>,
    pub segment_code: Option<String>,
    pub segment_name: Option<String>,
}

// ── Order-grain accumulators ─────────────────────────────────────────────────

#[derive(Default)]
struct ItemAgg {
    revenue: f64,
    freight: f64,
    count: i64,
    products: BTreeSet<String>,
    categories: BTreeSet<String>,
}

#[derive(Default)]
struct PaymentAgg {
    total: f64,
    methods: BTreeSet<String>,
    max_installments: i64,
}

#[derive(Default)]
struct ReviewAgg {
    score_sum: f64,
    count: i64,
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct OrderFactsStage;

impl OrderFactsStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrderFactsStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FactStage for OrderFactsStage {
    fn name(&self) -> &'static str {
        "order_facts"
    }

    fn output_table(&self) -> &'static str {
        "order_fact"
    }

    fn run(&mut self, ctx: &StageContext<'_>) -> PipelineResult<StageReport> {
        let delivered = ctx.store.load_delivered_orders(ctx.run_id)?;
        let raw_customers = ctx.store.load_raw_customers(ctx.run_id)?;
        let items = ctx.store.load_raw_order_items(ctx.run_id)?;
        let payments = ctx.store.load_raw_payments(ctx.run_id)?;
        let reviews = ctx.store.load_raw_reviews(ctx.run_id)?;
        let products = ctx.store.load_raw_products(ctx.run_id)?;
        let segments = ctx.store.load_segments(ctx.run_id)?;

        let id_to_unique: HashMap<&str, &str> = raw_customers
            .iter()
            .map(|r| (r.customer_id.as_str(), r.customer_unique_id.as_str()))
            .collect();

        let category_of: HashMap<&str, &str> = products
            .iter()
            .filter_map(|p| {
                p.category_name
                    .as_deref()
                    .map(|c| (p.product_id.as_str(), c))
            })
            .collect();

        let segment_of: HashMap<&str, (&str, &str)> = segments
            .iter()
            .map(|s| {
                (
                    s.customer_unique_id.as_str(),
                    (s.segment_code.as_str(), s.segment_name.as_str()),
                )
            })
            .collect();

        // Pass 1: child tables to order grain.
        let mut item_aggs: HashMap<&str, ItemAgg> = HashMap::new();
        for item in &items {
            let agg = item_aggs.entry(item.order_id.as_str()).or_default();
            agg.revenue += item.price;
            agg.freight += item.freight_value;
            agg.count += 1;
            agg.products.insert(item.product_id.clone());
            // Products missing a category contribute nothing.
            if let Some(cat) = category_of.get(item.product_id.as_str()) {
                agg.categories.insert((*cat).to_string());
            }
        }

        let mut payment_aggs: HashMap<&str, PaymentAgg> = HashMap::new();
        for p in &payments {
            let agg = payment_aggs.entry(p.order_id.as_str()).or_default();
            agg.total += p.payment_value;
            agg.methods.insert(p.payment_type.clone());
            agg.max_installments = agg.max_installments.max(p.installments);
        }

        let mut review_aggs: HashMap<&str, ReviewAgg> = HashMap::new();
        for r in &reviews {
            let agg = review_aggs.entry(r.order_id.as_str()).or_default();
            agg.score_sum += r.review_score as f64;
            agg.count += 1;
        }

        // Pass 2: 1:1 merge onto the delivered order list.
        let mut report = StageReport::default();
        let mut rows = Vec::with_capacity(delivered.len());
        for order in &delivered {
            let Some(&unique) = id_to_unique.get(order.customer_id.as_str()) else {
                log::warn!(
                    "stage=order_facts order {} has no raw customer record; skipped",
                    order.order_id
                );
                report.flag("order_missing_customer", order.order_id.clone());
                continue;
            };

            let purchase_ts = order.purchase_ts.clone().expect("delivered subset");

            let (items_revenue, freight_value, item_count, distinct_products, distinct_categories) =
                match item_aggs.get(order.order_id.as_str()) {
                    Some(a) => (
                        round2(a.revenue),
                        round2(a.freight),
                        a.count,
                        a.products.len() as i64,
                        a.categories.len() as i64,
                    ),
                    None => (0.0, 0.0, 0, 0, 0),
                };

            let (payment_total, payment_methods, max_installments) =
                match payment_aggs.get(order.order_id.as_str()) {
                    Some(a) => (round2(a.total), a.methods.len() as i64, a.max_installments),
                    None => (0.0, 0, 0),
                };

            let review_score = review_aggs
                .get(order.order_id.as_str())
                .map(|a| round4(a.score_sum / a.count as f64));

            let (segment_code, segment_name) = match segment_of.get(unique) {
                Some((code, name)) => (Some((*code).to_string()), Some((*name).to_string())),
                None => (None, None),
            };

            rows.push(OrderFact {
                order_id: order.order_id.clone(),
                customer_unique_id: unique.to_string(),
                purchase_ts,
                items_revenue,
                freight_value,
                // Components are cent-rounded first, so the sum holds to
                // the cent by construction.
                gross_order_value: items_revenue + freight_value,
                item_count,
                distinct_products,
                distinct_categories,
                payment_total,
                payment_methods,
                max_installments,
                review_score,
                segment_code,
                segment_name,
            });
        }

        ctx.store.replace_order_facts(ctx.run_id, &rows)?;
        report.rows_written = rows.len() as u64;
        Ok(report)
    }
}
