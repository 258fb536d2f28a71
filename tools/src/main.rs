//! pipeline-runner: headless analytics pipeline runner.
//!
//! Usage:
//!   pipeline-runner --seed 12345 --customers 500 --db analytics.db
//!   pipeline-runner --seed 12345 --data-dir ./data

use anyhow::Result;
use commerce_core::{
    config::PipelineConfig, engine::PipelineEngine, store::SqlStore, synthetic,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let customers = parse_arg(&args, "--customers", 0usize);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    println!("commerce analytics — pipeline-runner");
    println!("  seed:      {seed}");
    println!("  db:        {db}");
    println!("  data_dir:  {data_dir}");
    println!();

    let mut config = PipelineConfig::load(data_dir)?;
    if customers > 0 {
        config.synth.customers = customers;
    }

    // For :memory: use a SQLite shared-memory URI so a reopened connection
    // would still see the same database.
    let db_effective: String = if db == ":memory:" {
        format!("file:pipeline_{}?mode=memory&cache=shared", unix_now())
    } else {
        db.to_string()
    };
    let store = SqlStore::open(&db_effective)?;
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", unix_now());
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;

    let extract = synthetic::generate(&config.synth, seed)?;
    synthetic::load_into(&store, &run_id, &extract)?;
    println!(
        "synthetic extract: {} customers, {} orders, {} items",
        extract.customers.len(),
        extract.orders.len(),
        extract.items.len(),
    );

    let mut engine = PipelineEngine::build(run_id.clone(), config, store);
    let summary = engine.run()?;

    print_summary(&engine, &run_id, &summary)?;
    Ok(())
}

fn print_summary(
    engine: &PipelineEngine,
    run_id: &str,
    summary: &commerce_core::engine::RunSummary,
) -> Result<()> {
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:              {run_id}");
    println!(
        "  horizon:             {}",
        commerce_core::types::fmt_ts(summary.horizon.max_purchase_ts)
    );
    println!(
        "  observed range:      {} .. {}",
        summary.horizon.min_purchase_date, summary.horizon.max_purchase_date
    );
    println!("  canonical customers: {}", summary.canonical_customers);
    println!("  order facts:         {}", summary.order_facts);
    println!("  rfm customers:       {}", summary.rfm_customers);
    println!("  time features:       {}", summary.time_feature_customers);
    println!("  cohort rows:         {}", summary.cohort_rows);
    println!("  retention rows:      {}", summary.retention_rows);
    println!("  segment retention:   {}", summary.retention_segment_rows);
    println!("  prioritized:         {}", summary.prioritized_customers);
    println!("  date dim rows:       {}", summary.date_dim_rows);
    println!("  quality flags:       {}", summary.quality_flags);

    let prioritized = engine.store.load_prioritized_customers(run_id)?;
    let high = prioritized
        .iter()
        .filter(|p| p.priority_band == "HIGH")
        .count();
    let medium = prioritized
        .iter()
        .filter(|p| p.priority_band == "MEDIUM")
        .count();
    println!();
    println!("=== PRIORITY BANDS ===");
    println!("  HIGH:   {high}");
    println!("  MEDIUM: {medium}");
    println!("  LOW:    {}", prioritized.len() - high - medium);

    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
