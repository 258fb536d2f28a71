//! Deterministic synthetic extract generator.
//!
//! Produces an Olist-shaped raw extract (plus the two external collaborator
//! tables) from a single seed and the catalog in SynthConfig. The same seed
//! always yields the same extract, so a pipeline run over it is fully
//! reproducible end to end. All randomness flows through SeededRng.

use crate::{
    config::SynthConfig,
    error::PipelineResult,
    raw::{
        ChurnScoreRecord, RawCustomerRecord, RawOrder, RawOrderItem, RawPayment, RawProduct,
        RawReview, SegmentRecord,
    },
    rng::SeededRng,
    store::SqlStore,
    types::{fmt_ts, round2, round4},
};
use chrono::{Duration, NaiveDate};

const NON_DELIVERED_STATUSES: [&str; 3] = ["shipped", "canceled", "processing"];

#[derive(Debug, Default)]
pub struct SyntheticExtract {
    pub customers: Vec<RawCustomerRecord>,
    pub orders: Vec<RawOrder>,
    pub items: Vec<RawOrderItem>,
    pub payments: Vec<RawPayment>,
    pub reviews: Vec<RawReview>,
    pub products: Vec<RawProduct>,
    pub churn_scores: Vec<ChurnScoreRecord>,
    pub segments: Vec<SegmentRecord>,
}

pub fn generate(config: &SynthConfig, seed: u64) -> PipelineResult<SyntheticExtract> {
    let start = parse_date(&config.start_date)?;
    let end = parse_date(&config.end_date)?;
    let range_days = ((end - start).num_days().max(0) + 1) as u64;

    let mut rng = SeededRng::new(seed);
    let mut out = SyntheticExtract::default();

    for _ in 0..config.products {
        out.products.push(RawProduct {
            product_id: rng.hex_id(),
            // A few products arrive uncategorised, as in real extracts.
            category_name: if rng.chance(0.95) {
                Some(rng.pick(&config.categories).clone())
            } else {
                None
            },
        });
    }

    for _ in 0..config.customers {
        let unique_id = rng.hex_id();

        let region = rng.pick(&config.regions).clone();
        let city = rng.pick(&region.cities).clone();
        let zip = format!("{:05}", rng.next_u64_below(100_000));

        let mut customer_ids = vec![rng.hex_id()];
        out.customers.push(RawCustomerRecord {
            customer_id: customer_ids[0].clone(),
            customer_unique_id: unique_id.clone(),
            zip_prefix: Some(zip.clone()),
            city: Some(city.clone()),
            state: Some(region.state.clone()),
        });

        // Some unique customers carry a second raw record, occasionally
        // disagreeing on location — the identity resolver's workload.
        if rng.chance(config.duplicate_record_rate) {
            let dup_id = rng.hex_id();
            let (dup_city, dup_state, dup_zip) = if rng.chance(config.conflicting_location_rate) {
                let other = rng.pick(&config.regions).clone();
                (
                    rng.pick(&other.cities).clone(),
                    other.state.clone(),
                    format!("{:05}", rng.next_u64_below(100_000)),
                )
            } else {
                (city.clone(), region.state.clone(), zip.clone())
            };
            customer_ids.push(dup_id.clone());
            out.customers.push(RawCustomerRecord {
                customer_id: dup_id,
                customer_unique_id: unique_id.clone(),
                zip_prefix: Some(dup_zip),
                city: Some(dup_city),
                state: Some(dup_state),
            });
        }

        let order_count = 1 + rng.next_u64_below(config.max_orders_per_customer);
        for _ in 0..order_count {
            let order_id = rng.hex_id();
            let day = start + Duration::days(rng.next_u64_below(range_days) as i64);
            let purchase = day
                .and_hms_opt(
                    rng.next_u64_below(24) as u32,
                    rng.next_u64_below(60) as u32,
                    rng.next_u64_below(60) as u32,
                )
                .expect("valid time components");

            let delivered = rng.chance(config.delivered_rate);
            // A sliver of orders arrives without a purchase timestamp; the
            // delivered-subset predicate must filter these out.
            let purchase_ts = if rng.chance(0.02) {
                None
            } else {
                Some(fmt_ts(purchase))
            };
            let delivered_ts = if delivered {
                Some(fmt_ts(purchase + Duration::days(3 + rng.next_u64_below(12) as i64)))
            } else {
                None
            };

            out.orders.push(RawOrder {
                order_id: order_id.clone(),
                customer_id: rng.pick(&customer_ids).clone(),
                status: if delivered {
                    "delivered".to_string()
                } else {
                    rng.pick(&NON_DELIVERED_STATUSES).to_string()
                },
                purchase_ts: purchase_ts.clone(),
                delivered_ts,
            });

            let mut gross = 0.0;
            let item_count = 1 + rng.next_u64_below(config.max_items_per_order);
            for seq in 0..item_count {
                let product = rng.pick(&out.products).product_id.clone();
                let price = round2(
                    rng.pareto(config.price_pareto_xmin, config.price_pareto_alpha)
                        .min(2_000.0),
                );
                let freight = round2(rng.pareto(5.0, 2.5).min(120.0));
                gross += price + freight;
                out.items.push(RawOrderItem {
                    order_id: order_id.clone(),
                    item_seq: seq as i64 + 1,
                    product_id: product,
                    price,
                    freight_value: freight,
                });
            }

            let installments = 1 + rng.next_u64_below(config.max_installments as u64) as i64;
            if rng.chance(0.85) {
                out.payments.push(RawPayment {
                    order_id: order_id.clone(),
                    payment_seq: 1,
                    payment_type: rng.pick(&config.payment_types).clone(),
                    installments,
                    payment_value: round2(gross),
                });
            } else {
                let first = round2(gross * (0.3 + 0.4 * rng.next_f64()));
                out.payments.push(RawPayment {
                    order_id: order_id.clone(),
                    payment_seq: 1,
                    payment_type: rng.pick(&config.payment_types).clone(),
                    installments,
                    payment_value: first,
                });
                out.payments.push(RawPayment {
                    order_id: order_id.clone(),
                    payment_seq: 2,
                    payment_type: rng.pick(&config.payment_types).clone(),
                    installments: 1,
                    payment_value: round2(gross - first),
                });
            }

            if delivered && purchase_ts.is_some() && rng.chance(config.review_rate) {
                out.reviews.push(RawReview {
                    review_id: rng.hex_id(),
                    order_id: order_id.clone(),
                    review_score: 1 + rng.next_u64_below(5) as i64,
                });
            }
        }

        out.churn_scores.push(ChurnScoreRecord {
            customer_unique_id: unique_id.clone(),
            churn_risk: round4(rng.next_f64()),
        });

        if rng.chance(config.segment_coverage) {
            let segment = rng.pick(&config.segments).clone();
            out.segments.push(SegmentRecord {
                customer_unique_id: unique_id,
                segment_code: segment.code,
                segment_name: segment.name,
            });
        }
    }

    Ok(out)
}

/// Load a generated extract into the raw tables of a run.
pub fn load_into(store: &SqlStore, run_id: &str, extract: &SyntheticExtract) -> PipelineResult<()> {
    store.insert_raw_customers(run_id, &extract.customers)?;
    store.insert_raw_orders(run_id, &extract.orders)?;
    store.insert_raw_order_items(run_id, &extract.items)?;
    store.insert_raw_payments(run_id, &extract.payments)?;
    store.insert_raw_reviews(run_id, &extract.reviews)?;
    store.insert_raw_products(run_id, &extract.products)?;
    store.insert_churn_scores(run_id, &extract.churn_scores)?;
    store.insert_segments(run_id, &extract.segments)?;
    Ok(())
}

fn parse_date(s: &str) -> PipelineResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid date '{s}' in synth config: {e}").into())
}
