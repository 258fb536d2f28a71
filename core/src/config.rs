use serde::{Deserialize, Serialize};

// ── Prioritization actions ─────────────────────────────────────────

/// One cell of the (churn_band, value_band) action table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRule {
    pub churn_band: i64,
    pub value_band: i64,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMatrix {
    pub rules: Vec<ActionRule>,
}

impl ActionMatrix {
    /// Static action text for a band combination. Bands are always in
    /// 1..=3, so a miss means a truncated config file.
    pub fn lookup(&self, churn_band: i64, value_band: i64) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.churn_band == churn_band && r.value_band == value_band)
            .map(|r| r.action.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ActionsFile {
    fiscal_year_start_month: u32,
    actions: Vec<ActionRule>,
}

// ── Synthetic extract catalog ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionEntry {
    pub state: String,
    pub cities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    pub customers: usize,
    pub products: usize,
    /// First and last possible purchase date, inclusive ("%Y-%m-%d").
    pub start_date: String,
    pub end_date: String,
    /// Probability that a unique customer carries a second raw record.
    pub duplicate_record_rate: f64,
    /// Probability that a duplicate record disagrees on location.
    pub conflicting_location_rate: f64,
    /// Probability that a generated order is delivered (vs shipped/canceled).
    pub delivered_rate: f64,
    /// Probability that a delivered order has a review.
    pub review_rate: f64,
    /// Share of customers that carry a segment label.
    pub segment_coverage: f64,
    pub max_orders_per_customer: u64,
    pub max_items_per_order: u64,
    pub max_installments: i64,
    pub price_pareto_xmin: f64,
    pub price_pareto_alpha: f64,
    pub regions: Vec<RegionEntry>,
    pub categories: Vec<String>,
    pub payment_types: Vec<String>,
    pub segments: Vec<SegmentEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct SynthCatalogFile {
    synth: SynthConfig,
}

// ── Pipeline config ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Month the fiscal year starts in (4 = April).
    pub fiscal_year_start_month: u32,
    pub actions: ActionMatrix,
    pub synth: SynthConfig,
}

impl PipelineConfig {
    /// Load from the data/ directory.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/pipeline_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: ActionsFile = serde_json::from_str(&content)?;

        let catalog_path = format!("{data_dir}/synth_catalog.json");
        let catalog_content = std::fs::read_to_string(&catalog_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {catalog_path}: {e}"))?;
        let catalog: SynthCatalogFile = serde_json::from_str(&catalog_content)?;

        Ok(Self {
            fiscal_year_start_month: file.fiscal_year_start_month,
            actions: ActionMatrix {
                rules: file.actions,
            },
            synth: catalog.synth,
        })
    }

    pub fn default_test() -> Self {
        let actions = [
            (1, 1, "Personal retention outreach with premium win-back incentive"),
            (1, 2, "Targeted discount offer and satisfaction follow-up"),
            (1, 3, "Automated win-back email with low-cost coupon"),
            (2, 1, "Priority loyalty perks to deepen engagement"),
            (2, 2, "Cross-sell campaign on frequently bought categories"),
            (2, 3, "Newsletter re-engagement cadence"),
            (3, 1, "Early-access and VIP program enrollment"),
            (3, 2, "Standard loyalty communications"),
            (3, 3, "No action; monitor quarterly"),
        ]
        .into_iter()
        .map(|(churn_band, value_band, action)| ActionRule {
            churn_band,
            value_band,
            action: action.to_string(),
        })
        .collect();

        Self {
            fiscal_year_start_month: 4,
            actions: ActionMatrix { rules: actions },
            synth: SynthConfig {
                customers: 200,
                products: 60,
                start_date: "2022-06-01".to_string(),
                end_date: "2023-05-31".to_string(),
                duplicate_record_rate: 0.15,
                conflicting_location_rate: 0.40,
                delivered_rate: 0.90,
                review_rate: 0.70,
                segment_coverage: 0.80,
                max_orders_per_customer: 6,
                max_items_per_order: 4,
                max_installments: 12,
                price_pareto_xmin: 15.0,
                price_pareto_alpha: 2.2,
                regions: vec![
                    RegionEntry {
                        state: "SP".to_string(),
                        cities: vec!["sao paulo".to_string(), "campinas".to_string()],
                    },
                    RegionEntry {
                        state: "RJ".to_string(),
                        cities: vec!["rio de janeiro".to_string(), "niteroi".to_string()],
                    },
                    RegionEntry {
                        state: "MG".to_string(),
                        cities: vec!["belo horizonte".to_string(), "uberlandia".to_string()],
                    },
                ],
                categories: vec![
                    "bed_bath_table".to_string(),
                    "health_beauty".to_string(),
                    "sports_leisure".to_string(),
                    "computers_accessories".to_string(),
                    "furniture_decor".to_string(),
                    "toys".to_string(),
                ],
                payment_types: vec![
                    "credit_card".to_string(),
                    "boleto".to_string(),
                    "voucher".to_string(),
                    "debit_card".to_string(),
                ],
                segments: vec![
                    SegmentEntry {
                        code: "S1".to_string(),
                        name: "Champions".to_string(),
                    },
                    SegmentEntry {
                        code: "S2".to_string(),
                        name: "At-Risk High Value".to_string(),
                    },
                    SegmentEntry {
                        code: "S3".to_string(),
                        name: "Loyal Low Spend".to_string(),
                    },
                    SegmentEntry {
                        code: "S4".to_string(),
                        name: "New Customers".to_string(),
                    },
                    SegmentEntry {
                        code: "S5".to_string(),
                        name: "Occasional Shoppers".to_string(),
                    },
                ],
            },
        }
    }
}
