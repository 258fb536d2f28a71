//! commerce-core — batch customer analytics over e-commerce extracts.
//!
//! Raw transaction tables in, layered customer-centric tables out:
//! canonical identities, an order fact table, RFM and time-window
//! features, cohort retention, and a churn-risk-weighted target list.
//! Every run fully rebuilds its outputs; nothing is patched in place.

pub mod cohort_stage;
pub mod config;
pub mod date_dim_stage;
pub mod engine;
pub mod error;
pub mod event;
pub mod horizon;
pub mod identity_stage;
pub mod order_facts_stage;
pub mod priority_stage;
pub mod raw;
pub mod retention_stage;
pub mod rfm_stage;
pub mod rng;
pub mod stage;
pub mod store;
pub mod synthetic;
pub mod time_features_stage;
pub mod types;
