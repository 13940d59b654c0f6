//! BasketForge: customer purchase analytics for a small component retailer
//!
//! Loads seed customers, products and orders into a SQLite star schema,
//! scores customers with RFM (Recency, Frequency, Monetary) segmentation,
//! mines association rules over order baskets and renders summary charts.

pub mod basket;
pub mod cli;
pub mod data;
pub mod mining;
pub mod report;
pub mod rfm;
pub mod telemetry;
pub mod viz;
pub mod warehouse;

// Re-export public items for easier access
pub use basket::BasketMatrix;
pub use cli::Args;
pub use data::{Customer, Dataset, Order, Product};
pub use mining::{
    apriori, association_rules, AprioriConfig, AssociationRule, FrequentItemset, RuleMetric,
};
pub use report::{sales_by_product, ProductSales};
pub use rfm::{compute_rfm, segment_counts, RfmRecord, Segment};
pub use warehouse::{LoadSummary, Warehouse};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
