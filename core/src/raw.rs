//! Typed raw input records.
//!
//! These mirror the upstream extract shapes one-to-one. The pipeline treats
//! them as immutable: every run reads the full extract and rebuilds the
//! analytical tables from scratch.

use crate::types::{CustomerId, CustomerUniqueId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCustomerRecord {
    pub customer_id: CustomerId,
    pub customer_unique_id: CustomerUniqueId,
    pub zip_prefix: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Orders enter analytics only through the delivered subset: status
/// "delivered" with a purchase timestamp present. The store's
/// `load_delivered_orders` is the single place that predicate lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub status: String,
    pub purchase_ts: Option<String>,
    pub delivered_ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrderItem {
    pub order_id: OrderId,
    pub item_seq: i64,
    pub product_id: ProductId,
    pub price: f64,
    pub freight_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayment {
    pub order_id: OrderId,
    pub payment_seq: i64,
    pub payment_type: String,
    pub installments: i64,
    pub payment_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub review_id: String,
    pub order_id: OrderId,
    pub review_score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    pub product_id: ProductId,
    pub category_name: Option<String>,
}

/// External input: churn probability per customer, produced by the scoring
/// collaborator. The pipeline treats the probability as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnScoreRecord {
    pub customer_unique_id: CustomerUniqueId,
    pub churn_risk: f64,
}

/// External input: behavioural segment label per customer, produced by the
/// segmentation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub customer_unique_id: CustomerUniqueId,
    pub segment_code: String,
    pub segment_name: String,
}
