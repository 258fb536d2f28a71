use commerce_core::{
    engine::PipelineEngine,
    raw::{ChurnScoreRecord, RawCustomerRecord, RawOrder, RawOrderItem},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_engine(run_id: &str) -> PipelineEngine {
    PipelineEngine::build_test(run_id).unwrap()
}

fn customer(cid: &str, uid: &str) -> RawCustomerRecord {
    RawCustomerRecord {
        customer_id: cid.into(),
        customer_unique_id: uid.into(),
        zip_prefix: Some("100".into()),
        city: Some("NY".into()),
        state: Some("NY".into()),
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

fn item(oid: &str, price: f64, freight: f64) -> RawOrderItem {
    RawOrderItem {
        order_id: oid.into(),
        item_seq: 1,
        product_id: "p1".into(),
        price,
        freight_value: freight,
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

/// Worked example: orders on 2023-01-10 and 2023-04-15 with the horizon at
/// 2023-04-15 give recency 0, frequency 2, tenure 95.
#[test]
fn recency_frequency_tenure_worked_example() {
    let run = "rfm-example";
    let mut engine = make_engine(run);

    engine.store.insert_raw_customers(run, &[customer("c1", "u1")]).unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2023-01-10 09:00:00"),
                delivered("o2", "c1", "2023-04-15 18:00:00"),
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1"]);

    engine.run().unwrap();

    let rfm = engine.store.get_customer_rfm(run, "u1").unwrap().unwrap();
    assert_eq!(rfm.recency_days, 0);
    assert_eq!(rfm.frequency, 2);
    assert_eq!(rfm.tenure_days, 95);
    assert_eq!(rfm.avg_days_between_orders, Some(95.0));
}

/// A single delivered order means no observed cadence: the gap is NULL,
/// never zero, and tenure is 0.
#[test]
fn single_order_customer_has_null_gap() {
    let run = "rfm-single";
    let mut engine = make_engine(run);

    engine.store.insert_raw_customers(run, &[customer("c1", "u1")]).unwrap();
    engine
        .store
        .insert_raw_orders(run, &[delivered("o1", "c1", "2023-02-01 12:00:00")])
        .unwrap();
    seed_scores(&engine, run, &["u1"]);

    engine.run().unwrap();

    let rfm = engine.store.get_customer_rfm(run, "u1").unwrap().unwrap();
    assert_eq!(rfm.frequency, 1);
    assert_eq!(rfm.tenure_days, 0);
    assert!(rfm.avg_days_between_orders.is_none());
}

/// Two customers sharing a last purchase timestamp must share recency,
/// whatever else differs between them.
#[test]
fn recency_is_equal_for_equal_last_purchase() {
    let run = "rfm-monotonic";
    let mut engine = make_engine(run);

    engine
        .store
        .insert_raw_customers(run, &[customer("c1", "u1"), customer("c2", "u2")])
        .unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2022-11-03 08:00:00"),
                delivered("o2", "c1", "2023-03-01 10:00:00"),
                delivered("o3", "c2", "2023-03-01 22:45:00"),
                delivered("o4", "c2", "2023-04-20 07:30:00"), // moves the horizon
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1", "u2"]);

    engine.run().unwrap();

    let u1 = engine.store.get_customer_rfm(run, "u1").unwrap().unwrap();
    // u1's last purchase is 2023-03-01; horizon is 2023-04-20.
    assert_eq!(u1.recency_days, 50);

    // Now compare against another customer whose last order shares the date.
    let run2 = "rfm-monotonic-2";
    let mut engine2 = make_engine(run2);
    engine2
        .store
        .insert_raw_customers(run2, &[customer("c1", "u1"), customer("c2", "u2"), customer("c3", "u3")])
        .unwrap();
    engine2
        .store
        .insert_raw_orders(
            run2,
            &[
                delivered("o1", "c1", "2023-03-01 01:00:00"),
                delivered("o2", "c2", "2023-03-01 23:59:59"),
                delivered("o3", "c3", "2023-04-20 12:00:00"),
            ],
        )
        .unwrap();
    seed_scores(&engine2, run2, &["u1", "u2", "u3"]);
    engine2.run().unwrap();

    let a = engine2.store.get_customer_rfm(run2, "u1").unwrap().unwrap();
    let b = engine2.store.get_customer_rfm(run2, "u2").unwrap().unwrap();
    assert_eq!(a.recency_days, b.recency_days);
}

/// Monetary sums gross order value; averages derive from it.
#[test]
fn monetary_and_averages() {
    let run = "rfm-monetary";
    let mut engine = make_engine(run);

    engine.store.insert_raw_customers(run, &[customer("c1", "u1")]).unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2023-01-10 09:00:00"),
                delivered("o2", "c1", "2023-02-10 09:00:00"),
            ],
        )
        .unwrap();
    engine
        .store
        .insert_raw_order_items(
            run,
            &[item("o1", 90.00, 10.00), item("o2", 45.00, 5.00)],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1"]);

    engine.run().unwrap();

    let rfm = engine.store.get_customer_rfm(run, "u1").unwrap().unwrap();
    assert_eq!(rfm.monetary, 150.00);
    assert_eq!(rfm.avg_order_value, 75.00);
    assert_eq!(rfm.avg_items_per_order, 1.0);
}

/// CanonicalCustomer.tenure_days and CustomerRFM.tenure_days agree whenever
/// both exist, and both are non-negative.
#[test]
fn tenure_matches_canonical_customer() {
    let run = "rfm-tenure";
    let mut engine = make_engine(run);

    engine.store.insert_raw_customers(run, &[customer("c1", "u1")]).unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2022-12-05 09:00:00"),
                delivered("o2", "c1", "2023-01-20 09:00:00"),
                delivered("o3", "c1", "2023-03-08 09:00:00"),
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1"]);

    engine.run().unwrap();

    let canonical = engine.store.get_canonical_customer(run, "u1").unwrap().unwrap();
    let rfm = engine.store.get_customer_rfm(run, "u1").unwrap().unwrap();

    assert!(rfm.tenure_days >= 0);
    assert_eq!(canonical.tenure_days, Some(rfm.tenure_days));
}
