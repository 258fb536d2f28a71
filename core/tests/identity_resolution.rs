use commerce_core::{
    engine::PipelineEngine,
    raw::{ChurnScoreRecord, RawCustomerRecord, RawOrder},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_engine(run_id: &str) -> PipelineEngine {
    PipelineEngine::build_test(run_id).unwrap()
}

fn customer(cid: &str, uid: &str, city: &str, state: &str, zip: &str) -> RawCustomerRecord {
    RawCustomerRecord {
        customer_id: cid.into(),
        customer_unique_id: uid.into(),
        zip_prefix: Some(zip.into()),
        city: Some(city.into()),
        state: Some(state.into()),
    }
}

fn delivered(oid: &str, cid: &str, ts: &str) -> RawOrder {
    RawOrder {
        order_id: oid.into(),
        customer_id: cid.into(),
        status: "delivered".into(),
        purchase_ts: Some(ts.into()),
        delivered_ts: None,
    }
}

fn seed_scores(engine: &PipelineEngine, run_id: &str, uids: &[&str]) {
    let rows: Vec<ChurnScoreRecord> = uids
        .iter()
        .map(|uid| ChurnScoreRecord {
            customer_unique_id: uid.to_string(),
            churn_risk: 0.5,
        })
        .collect();
    engine.store.insert_churn_scores(run_id, &rows).unwrap();
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Two records say NY, one says LA: the majority location wins.
#[test]
fn majority_location_wins() {
    let run = "identity-majority";
    let mut engine = make_engine(run);

    engine
        .store
        .insert_raw_customers(
            run,
            &[
                customer("c1", "u1", "NY", "NY", "100"),
                customer("c2", "u1", "NY", "NY", "100"),
                customer("c3", "u1", "LA", "CA", "200"),
            ],
        )
        .unwrap();
    engine
        .store
        .insert_raw_orders(run, &[delivered("o1", "c1", "2023-01-10 09:00:00")])
        .unwrap();
    seed_scores(&engine, run, &["u1"]);

    engine.run().unwrap();

    let resolved = engine.store.get_canonical_customer(run, "u1").unwrap().unwrap();
    assert_eq!(resolved.city.as_deref(), Some("NY"));
    assert_eq!(resolved.state.as_deref(), Some("NY"));
    assert_eq!(resolved.zip_prefix.as_deref(), Some("100"));
}

/// An exact count tie resolves by ascending city name, and the outcome must
/// not depend on the order raw records were inserted in.
#[test]
fn location_tie_breaks_lexically_regardless_of_input_order() {
    let forward = "identity-tie-fwd";
    let mut engine_a = make_engine(forward);
    engine_a
        .store
        .insert_raw_customers(
            forward,
            &[
                customer("c1", "u1", "recife", "PE", "500"),
                customer("c2", "u1", "aracaju", "SE", "490"),
            ],
        )
        .unwrap();
    engine_a
        .store
        .insert_raw_orders(forward, &[delivered("o1", "c1", "2023-01-10 09:00:00")])
        .unwrap();
    seed_scores(&engine_a, forward, &["u1"]);
    engine_a.run().unwrap();

    let reversed = "identity-tie-rev";
    let mut engine_b = make_engine(reversed);
    engine_b
        .store
        .insert_raw_customers(
            reversed,
            &[
                customer("c2", "u1", "aracaju", "SE", "490"),
                customer("c1", "u1", "recife", "PE", "500"),
            ],
        )
        .unwrap();
    engine_b
        .store
        .insert_raw_orders(reversed, &[delivered("o1", "c1", "2023-01-10 09:00:00")])
        .unwrap();
    seed_scores(&engine_b, reversed, &["u1"]);
    engine_b.run().unwrap();

    let a = engine_a.store.get_canonical_customer(forward, "u1").unwrap().unwrap();
    let b = engine_b.store.get_canonical_customer(reversed, "u1").unwrap().unwrap();

    assert_eq!(a.city.as_deref(), Some("aracaju"), "ascending city wins the tie");
    assert_eq!(a.city, b.city);
    assert_eq!(a.state, b.state);
    assert_eq!(a.zip_prefix, b.zip_prefix);
}

/// A customer with raw records but no delivered order still resolves; the
/// order-derived fields stay NULL.
#[test]
fn location_only_customer_still_resolves() {
    let run = "identity-location-only";
    let mut engine = make_engine(run);

    engine
        .store
        .insert_raw_customers(
            run,
            &[
                customer("c1", "u1", "NY", "NY", "100"),
                customer("c9", "u9", "LA", "CA", "200"),
            ],
        )
        .unwrap();
    // Only u1 has a delivered order; u9's single order was canceled.
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2023-01-10 09:00:00"),
                RawOrder {
                    order_id: "o2".into(),
                    customer_id: "c9".into(),
                    status: "canceled".into(),
                    purchase_ts: Some("2023-02-01 12:00:00".into()),
                    delivered_ts: None,
                },
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1", "u9"]);

    engine.run().unwrap();

    let u9 = engine.store.get_canonical_customer(run, "u9").unwrap().unwrap();
    assert_eq!(u9.city.as_deref(), Some("LA"));
    assert_eq!(u9.delivered_orders, 0);
    assert!(u9.first_order_ts.is_none());
    assert!(u9.last_order_ts.is_none());
    assert!(u9.tenure_days.is_none());
}

/// Delivered orders placed under different customer_ids of the same unique
/// customer all count toward its first/last/tenure fields.
#[test]
fn order_span_covers_all_customer_ids_of_a_unique_customer() {
    let run = "identity-span";
    let mut engine = make_engine(run);

    engine
        .store
        .insert_raw_customers(
            run,
            &[
                customer("c1", "u1", "NY", "NY", "100"),
                customer("c2", "u1", "NY", "NY", "100"),
            ],
        )
        .unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2023-01-10 09:00:00"),
                delivered("o2", "c2", "2023-04-15 18:30:00"),
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1"]);

    engine.run().unwrap();

    let u1 = engine.store.get_canonical_customer(run, "u1").unwrap().unwrap();
    assert_eq!(u1.delivered_orders, 2);
    assert_eq!(u1.first_order_ts.as_deref(), Some("2023-01-10 09:00:00"));
    assert_eq!(u1.last_order_ts.as_deref(), Some("2023-04-15 18:30:00"));
    assert_eq!(u1.tenure_days, Some(95));
}

/// Exactly one canonical row per unique id, whatever the duplication level.
#[test]
fn one_row_per_unique_id() {
    let run = "identity-grain";
    let mut engine = make_engine(run);

    engine
        .store
        .insert_raw_customers(
            run,
            &[
                customer("c1", "u1", "NY", "NY", "100"),
                customer("c2", "u1", "NY", "NY", "100"),
                customer("c3", "u1", "LA", "CA", "200"),
                customer("c4", "u2", "SF", "CA", "300"),
            ],
        )
        .unwrap();
    engine
        .store
        .insert_raw_orders(run, &[delivered("o1", "c1", "2023-01-10 09:00:00")])
        .unwrap();
    seed_scores(&engine, run, &["u1", "u2"]);

    engine.run().unwrap();

    assert_eq!(engine.store.table_count("canonical_customer", run).unwrap(), 2);
}
