//! Console reports for RFM scores, association rules and sales

use polars::prelude::*;

use crate::mining::AssociationRule;
use crate::rfm::{RfmRecord, Segment};

/// Total sales of one product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub total_amount: f64,
}

/// Sum `total_amount` per product and attach product names
///
/// Products without sales and sales of unknown products are both dropped.
pub fn sales_by_product(
    sales: &DataFrame,
    products: &DataFrame,
) -> crate::Result<Vec<ProductSales>> {
    let joined = sales
        .clone()
        .lazy()
        .group_by([col("product_id")])
        .agg([col("total_amount").sum()])
        .join(
            products
                .clone()
                .lazy()
                .select([col("product_id"), col("name")]),
            [col("product_id")],
            [col("product_id")],
            JoinArgs::new(JoinType::Inner),
        )
        .sort(["product_id"], SortMultipleOptions::default())
        .collect()?;

    let ids = joined.column("product_id")?.str()?;
    let names = joined.column("name")?.str()?;
    let totals = joined.column("total_amount")?.f64()?;

    Ok(ids
        .into_no_null_iter()
        .zip(names.into_no_null_iter())
        .zip(totals.into_no_null_iter())
        .map(|((product_id, name), total_amount)| ProductSales {
            product_id: product_id.to_string(),
            name: name.to_string(),
            total_amount,
        })
        .collect())
}

pub fn format_itemset(items: &[String]) -> String {
    format!("{{{}}}", items.join(", "))
}

pub fn print_rfm_table(records: &[RfmRecord]) {
    println!("\nRFM Table:");
    println!(
        "  {:<11} | {:>7} | {:>9} | {:>10} | {}",
        "customer_id", "Recency", "Frequency", "Monetary", "Segment"
    );
    println!("  ------------|---------|-----------|------------|-----------");
    for r in records {
        println!(
            "  {:<11} | {:>7} | {:>9} | {:>10.2} | {}",
            r.customer_id, r.recency, r.frequency, r.monetary, r.segment
        );
    }
}

pub fn print_rules(rules: &[AssociationRule]) {
    println!("\nAssociation Rules:");
    println!(
        "  {:<20} | {:<20} | {:>7} | {:>10} | {:>6}",
        "antecedents", "consequents", "support", "confidence", "lift"
    );
    println!("  ---------------------|----------------------|---------|------------|-------");
    if rules.is_empty() {
        println!("  (no rules met the threshold)");
        return;
    }
    for rule in rules {
        println!(
            "  {:<20} | {:<20} | {:>7.3} | {:>10.3} | {:>6.3}",
            format_itemset(&rule.antecedents),
            format_itemset(&rule.consequents),
            rule.support,
            rule.confidence,
            rule.lift
        );
    }
}

pub fn print_sales_by_product(sales: &[ProductSales]) {
    println!("\nTotal Sales by Product:");
    for s in sales {
        println!("  {:<4} {:<16} {:>10.2}", s.product_id, s.name, s.total_amount);
    }
}

pub fn print_segment_counts(counts: &[(Segment, usize)]) {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    println!("\nCustomer Segments:");
    for (segment, n) in counts {
        let percentage = (*n as f64 / total as f64) * 100.0;
        println!("  {:<10} {:>3} ({:.1}%)", segment.label(), n, percentage);
    }
}
