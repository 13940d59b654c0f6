//! BasketForge: purchase analytics pipeline
//!
//! Loads the star-schema warehouse, scores RFM segments, mines basket rules
//! and renders the summary charts, in that order.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use basketforge::{
    apriori, association_rules, compute_rfm, data, report, sales_by_product, segment_counts,
    telemetry, viz, Args, BasketMatrix, Dataset, Warehouse,
};

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing(&args.tracing_config())?;

    run_pipeline(&args)
}

fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Seed data
    let dataset = match &args.data_dir {
        Some(dir) => Dataset::from_csv_dir(dir)?,
        None => Dataset::sample()?,
    };
    info!(
        customers = dataset.customers.len(),
        products = dataset.products.len(),
        orders = dataset.orders.len(),
        "seed data ready"
    );

    // Step 2: Warehouse
    let mut warehouse = Warehouse::open(&args.database)?;
    warehouse
        .load_star_schema(&dataset)
        .with_context(|| format!("failed to load warehouse {}", args.database.display()))?;
    println!("Data Warehouse tables created successfully!");

    // Step 3: RFM
    let sales = data::sales_frame(&dataset.orders)?;
    let rfm = compute_rfm(&sales)?;
    report::print_rfm_table(&rfm);

    // Step 4: Market basket rules
    let basket = BasketMatrix::from_sales(&sales)?;
    let itemsets = apriori(&basket, &args.apriori_config())?;
    let rules = association_rules(&itemsets, args.metric, args.min_threshold)?;
    report::print_rules(&rules);

    // Step 5: Sales and segment summaries
    let products = data::products_frame(&dataset.products)?;
    let product_sales = sales_by_product(&sales, &products)?;
    let counts = segment_counts(&rfm);
    report::print_sales_by_product(&product_sales);
    report::print_segment_counts(&counts);

    if args.no_charts {
        debug!("chart rendering disabled");
    } else {
        std::fs::create_dir_all(&args.output_dir).with_context(|| {
            format!("failed to create output directory {}", args.output_dir.display())
        })?;
        let sales_chart = args.sales_chart_path();
        viz::render_sales_chart(&product_sales, &sales_chart)
            .with_context(|| format!("failed to render {}", sales_chart.display()))?;
        let segment_chart = args.segment_chart_path();
        viz::render_segment_chart(&counts, &segment_chart)
            .with_context(|| format!("failed to render {}", segment_chart.display()))?;
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "pipeline complete"
    );
    Ok(())
}
