use commerce_core::{
    engine::PipelineEngine,
    raw::{ChurnScoreRecord, RawCustomerRecord, RawOrder, SegmentRecord},
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

fn segment(uid: &str, code: &str) -> SegmentRecord {
    SegmentRecord {
        customer_unique_id: uid.into(),
        segment_code: code.into(),
        segment_name: format!("segment {code}"),
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

/// Worked example: cohort month 2023-01, next activity in 2023-03 gives
/// month_index 2, and the month_index sequence starts at 0.
#[test]
fn month_index_worked_example() {
    let run = "cohort-index";
    let mut engine = make_engine(run);

    engine.store.insert_raw_customers(run, &[customer("c1", "u1")]).unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2023-01-12 09:00:00"),
                delivered("o2", "c1", "2023-03-28 17:00:00"),
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1"]);

    engine.run().unwrap();

    let cohorts = engine.store.load_customer_cohorts(run).unwrap();
    assert_eq!(cohorts.len(), 2);
    assert_eq!(cohorts[0].cohort_month, "2023-01-01");
    assert_eq!(cohorts[0].order_month, "2023-01-01");
    assert_eq!(cohorts[0].month_index, 0);
    assert_eq!(cohorts[1].order_month, "2023-03-01");
    assert_eq!(cohorts[1].month_index, 2);
}

/// month_index crosses year boundaries as whole calendar months.
#[test]
fn month_index_spans_year_boundary() {
    let run = "cohort-year";
    let mut engine = make_engine(run);

    engine.store.insert_raw_customers(run, &[customer("c1", "u1")]).unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2022-11-20 09:00:00"),
                delivered("o2", "c1", "2023-02-02 09:00:00"),
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1"]);

    engine.run().unwrap();

    let cohorts = engine.store.load_customer_cohorts(run).unwrap();
    assert_eq!(cohorts[1].month_index, 3);
}

/// Every customer's minimum month_index is exactly 0, and two orders in the
/// same month collapse into one (customer, month) row.
#[test]
fn minimum_month_index_is_zero() {
    let run = "cohort-min-zero";
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
                delivered("o1", "c1", "2023-01-05 09:00:00"),
                delivered("o2", "c1", "2023-01-25 09:00:00"),
                delivered("o3", "c1", "2023-02-14 09:00:00"),
                delivered("o4", "c2", "2023-02-01 09:00:00"),
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1", "u2"]);

    engine.run().unwrap();

    let cohorts = engine.store.load_customer_cohorts(run).unwrap();

    // u1: two distinct months (January collapses), u2: one month.
    assert_eq!(cohorts.len(), 3);

    for uid in ["u1", "u2"] {
        let min_index = cohorts
            .iter()
            .filter(|c| c.customer_unique_id == uid)
            .map(|c| c.month_index)
            .min()
            .unwrap();
        assert_eq!(min_index, 0, "customer {uid} must anchor at index 0");
    }
}

/// The month_index = 0 row of every cohort has retention_rate = 1.0 exactly.
#[test]
fn self_retention_is_exactly_one() {
    let run = "retention-self";
    let mut engine = make_engine(run);

    engine
        .store
        .insert_raw_customers(
            run,
            &[customer("c1", "u1"), customer("c2", "u2"), customer("c3", "u3")],
        )
        .unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2023-01-05 09:00:00"),
                delivered("o2", "c2", "2023-01-20 09:00:00"),
                delivered("o3", "c2", "2023-02-11 09:00:00"),
                delivered("o4", "c3", "2023-02-03 09:00:00"),
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1", "u2", "u3"]);

    engine.run().unwrap();

    let retention = engine.store.load_cohort_retention(run).unwrap();
    assert!(!retention.is_empty());
    for row in retention.iter().filter(|r| r.month_index == 0) {
        assert_eq!(
            row.retention_rate,
            Some(1.0),
            "cohort {} month 0 must self-retain",
            row.cohort_month
        );
        assert_eq!(row.retained_customers, row.cohort_size);
    }
}

/// Retained customers are counted distinct per month_index: the same
/// customer active twice in a month counts once, and counts at different
/// indices describe different universes (never additive).
#[test]
fn retention_counts_distinct_customers() {
    let run = "retention-distinct";
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
                delivered("o1", "c1", "2023-01-05 09:00:00"),
                delivered("o2", "c2", "2023-01-08 09:00:00"),
                delivered("o3", "c1", "2023-02-07 09:00:00"),
                delivered("o4", "c1", "2023-02-21 09:00:00"), // same month again
            ],
        )
        .unwrap();
    seed_scores(&engine, run, &["u1", "u2"]);

    engine.run().unwrap();

    let retention = engine.store.load_cohort_retention(run).unwrap();
    let jan = "2023-01-01";

    let m0 = retention
        .iter()
        .find(|r| r.cohort_month == jan && r.month_index == 0)
        .unwrap();
    assert_eq!(m0.cohort_size, 2);
    assert_eq!(m0.retained_customers, 2);

    let m1 = retention
        .iter()
        .find(|r| r.cohort_month == jan && r.month_index == 1)
        .unwrap();
    assert_eq!(m1.retained_customers, 1, "two February orders, one customer");
    assert_eq!(m1.retention_rate, Some(0.5));
}

/// Segmented retention sizes come from the month_index = 0 slice per
/// segment; customers with no segment label never enter the segmented
/// table even when active later.
#[test]
fn segmented_retention_uses_month_zero_slice() {
    let run = "retention-segmented";
    let mut engine = make_engine(run);

    engine
        .store
        .insert_raw_customers(
            run,
            &[customer("c1", "u1"), customer("c2", "u2"), customer("c3", "u3")],
        )
        .unwrap();
    engine
        .store
        .insert_raw_orders(
            run,
            &[
                delivered("o1", "c1", "2023-01-05 09:00:00"),
                delivered("o2", "c2", "2023-01-15 09:00:00"),
                delivered("o3", "c3", "2023-01-25 09:00:00"), // u3 has no segment
                delivered("o4", "c1", "2023-02-10 09:00:00"),
                delivered("o5", "c3", "2023-02-12 09:00:00"),
            ],
        )
        .unwrap();
    engine
        .store
        .insert_segments(run, &[segment("u1", "S1"), segment("u2", "S1")])
        .unwrap();
    seed_scores(&engine, run, &["u1", "u2", "u3"]);

    engine.run().unwrap();

    let segmented = engine.store.load_cohort_retention_segment(run).unwrap();

    let m0 = segmented
        .iter()
        .find(|r| r.cohort_month == "2023-01-01" && r.month_index == 0 && r.segment_code == "S1")
        .unwrap();
    assert_eq!(m0.cohort_size, 2, "u3 is unlabelled and excluded");
    assert_eq!(m0.retention_rate, Some(1.0));

    let m1 = segmented
        .iter()
        .find(|r| r.cohort_month == "2023-01-01" && r.month_index == 1 && r.segment_code == "S1")
        .unwrap();
    assert_eq!(m1.retained_customers, 1, "only u1 returned in February");
    assert_eq!(m1.retention_rate, Some(0.5));

    assert!(
        segmented.iter().all(|r| r.segment_code == "S1"),
        "unlabelled customers never appear in the segmented table"
    );
}
