use commerce_core::{
    engine::PipelineEngine,
    priority_stage::{priority_band, tertile_bands},
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

fn item(oid: &str, price: f64) -> RawOrderItem {
    RawOrderItem {
        order_id: oid.into(),
        item_seq: 1,
        product_id: "p1".into(),
        price,
        freight_value: 0.0,
    }
}

fn score(uid: &str, risk: f64) -> ChurnScoreRecord {
    ChurnScoreRecord {
        customer_unique_id: uid.into(),
        churn_risk: risk,
    }
}

/// Nine customers with distinct monetary values (900, 800, ... 100) and
/// churn risks descending with the customer index.
fn seed_nine(engine: &PipelineEngine, run: &str) {
    let customers: Vec<RawCustomerRecord> = (1..=9)
        .map(|i| customer(&format!("c{i}"), &format!("u{i}")))
        .collect();
    engine.store.insert_raw_customers(run, &customers).unwrap();

    let orders: Vec<RawOrder> = (1..=9)
        .map(|i| delivered(&format!("o{i}"), &format!("c{i}"), "2023-04-01 09:00:00"))
        .collect();
    engine.store.insert_raw_orders(run, &orders).unwrap();

    let items: Vec<RawOrderItem> = (1..=9)
        .map(|i| item(&format!("o{i}"), (10 - i) as f64 * 100.0))
        .collect();
    engine.store.insert_raw_order_items(run, &items).unwrap();

    let scores: Vec<ChurnScoreRecord> = (1..=9)
        .map(|i| score(&format!("u{i}"), 1.0 - i as f64 * 0.1))
        .collect();
    engine.store.insert_churn_scores(run, &scores).unwrap();
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Tertiles split nine distinct keys into three bands of three, 1 = top.
#[test]
fn nine_customers_split_into_three_bands() {
    let run = "priority-nine";
    let mut engine = make_engine(run);
    seed_nine(&engine, run);

    engine.run().unwrap();

    let prioritized = engine.store.load_prioritized_customers(run).unwrap();
    assert_eq!(prioritized.len(), 9);

    for p in &prioritized {
        // Customers u1..u9 descend in both risk and value together, so the
        // two bands coincide.
        assert_eq!(p.churn_band, p.value_band, "customer {}", p.customer_unique_id);
    }
    for band in 1..=3i64 {
        let n = prioritized.iter().filter(|p| p.churn_band == band).count();
        assert_eq!(n, 3, "band {band} must hold a third of the customers");
    }
}

/// The exact asymmetric priority rule: (1,1) HIGH; (1,2)/(2,1) MEDIUM;
/// everything else LOW.
#[test]
fn priority_band_rule_is_exact() {
    assert_eq!(priority_band(1, 1), "HIGH");
    assert_eq!(priority_band(1, 2), "MEDIUM");
    assert_eq!(priority_band(2, 1), "MEDIUM");
    assert_eq!(priority_band(1, 3), "LOW");
    assert_eq!(priority_band(3, 1), "LOW");
    assert_eq!(priority_band(2, 2), "LOW");
    assert_eq!(priority_band(3, 3), "LOW");
}

/// Top-tertile risk with top-tertile value is HIGH; the same risk with a
/// mid-tertile value drops to MEDIUM.
#[test]
fn high_and_medium_examples() {
    let run = "priority-examples";
    let mut engine = make_engine(run);

    let customers: Vec<RawCustomerRecord> = (1..=9)
        .map(|i| customer(&format!("c{i}"), &format!("u{i}")))
        .collect();
    engine.store.insert_raw_customers(run, &customers).unwrap();

    let orders: Vec<RawOrder> = (1..=9)
        .map(|i| delivered(&format!("o{i}"), &format!("c{i}"), "2023-04-01 09:00:00"))
        .collect();
    engine.store.insert_raw_orders(run, &orders).unwrap();

    // Monetary descends with the customer index: u1..u3 take value band 1,
    // u4..u6 band 2, u7..u9 band 3.
    let items: Vec<RawOrderItem> = (1..=9)
        .map(|i| item(&format!("o{i}"), (10 - i) as f64 * 100.0))
        .collect();
    engine.store.insert_raw_order_items(run, &items).unwrap();

    // u4 carries the single highest risk, so it lands in churn band 1
    // while sitting in value band 2.
    let scores: Vec<ChurnScoreRecord> = (1..=9)
        .map(|i| {
            let risk = if i == 4 { 0.95 } else { 0.90 - i as f64 * 0.09 };
            score(&format!("u{i}"), risk)
        })
        .collect();
    engine.store.insert_churn_scores(run, &scores).unwrap();

    engine.run().unwrap();

    let top = engine.store.get_prioritized_customer(run, "u1").unwrap().unwrap();
    assert_eq!(top.churn_band, 1);
    assert_eq!(top.value_band, 1);
    assert_eq!(top.priority_band, "HIGH");

    let mid_value = engine.store.get_prioritized_customer(run, "u4").unwrap().unwrap();
    assert_eq!(mid_value.churn_band, 1);
    assert_eq!(mid_value.value_band, 2);
    assert_eq!(mid_value.priority_band, "MEDIUM");

    let bottom = engine.store.get_prioritized_customer(run, "u9").unwrap().unwrap();
    assert_eq!(bottom.priority_band, "LOW");
}

/// value_at_risk = churn_risk × monetary, cent-rounded.
#[test]
fn value_at_risk_is_risk_times_monetary() {
    let run = "priority-var";
    let mut engine = make_engine(run);
    seed_nine(&engine, run);

    engine.run().unwrap();

    let p = engine.store.get_prioritized_customer(run, "u1").unwrap().unwrap();
    assert_eq!(p.monetary, 900.0);
    assert_eq!(p.churn_risk, 0.9);
    assert_eq!(p.value_at_risk, 810.0);
}

/// RFM customers without a churn score are skipped, not ranked with a
/// fabricated risk.
#[test]
fn customer_without_score_is_skipped() {
    let run = "priority-missing-score";
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
                delivered("o1", "c1", "2023-04-01 09:00:00"),
                delivered("o2", "c2", "2023-04-02 09:00:00"),
            ],
        )
        .unwrap();
    engine.store.insert_churn_scores(run, &[score("u1", 0.7)]).unwrap();

    engine.run().unwrap();

    assert_eq!(engine.store.table_count("prioritized_customer", run).unwrap(), 1);
    assert!(engine.store.get_prioritized_customer(run, "u2").unwrap().is_none());
}

/// Partition sizes follow ceil(n/3) for the first partitions with the
/// remainder in band 3, and boundary ties keep stable input order.
#[test]
fn tertile_partition_sizes_and_stable_ties() {
    // n = 7: ceil(7/3) = 3, so bands are 3 / 3 / 1.
    let keys = [70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0];
    let bands = tertile_bands(&keys);
    assert_eq!(bands, vec![1, 1, 1, 2, 2, 2, 3]);

    // All-equal keys: the stable sort preserves input order, so the first
    // ceil(n/3) inputs take band 1.
    let tied = [5.0, 5.0, 5.0, 5.0, 5.0, 5.0];
    let bands = tertile_bands(&tied);
    assert_eq!(bands, vec![1, 1, 2, 2, 3, 3]);

    // Tiny populations degrade gracefully.
    assert_eq!(tertile_bands(&[1.0]), vec![1]);
    assert_eq!(tertile_bands(&[2.0, 1.0]), vec![1, 2]);
    assert!(tertile_bands(&[]).is_empty());
}
