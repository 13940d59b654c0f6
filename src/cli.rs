//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::mining::{AprioriConfig, RuleMetric};
use crate::telemetry::TracingConfig;

/// Customer purchase analytics: warehouse load, RFM segments and basket rules
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory with customers.csv, products.csv and orders.csv (built-in sample if omitted)
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite warehouse file
    #[arg(long, default_value = "componentx_dw.db")]
    pub database: PathBuf,

    /// Directory for the rendered charts
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Minimum itemset support, in (0, 1]
    #[arg(long, default_value = "0.5")]
    pub min_support: f64,

    /// Metric used to filter association rules
    #[arg(long, value_enum, default_value_t = RuleMetric::Lift)]
    pub metric: RuleMetric,

    /// Minimum value of the rule metric
    #[arg(long, default_value = "1.0")]
    pub min_threshold: f64,

    /// Largest itemset size to mine
    #[arg(long)]
    pub max_len: Option<usize>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    pub fn apriori_config(&self) -> AprioriConfig {
        AprioriConfig {
            min_support: self.min_support,
            max_len: self.max_len,
        }
    }

    pub fn tracing_config(&self) -> TracingConfig {
        let filter = if self.verbose { "debug" } else { "info" };
        TracingConfig::new()
            .with_filter(filter)
            .with_json(self.log_json)
    }

    pub fn sales_chart_path(&self) -> PathBuf {
        self.output_dir.join("sales_by_product.png")
    }

    pub fn segment_chart_path(&self) -> PathBuf {
        self.output_dir.join("customer_segments.png")
    }
}
