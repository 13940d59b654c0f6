//! Chart rendering using Plotters

use std::path::Path;

use plotters::element::Pie;
use plotters::prelude::*;
use tracing::{info, warn};

use crate::report::ProductSales;
use crate::rfm::Segment;

/// Color palette for bars and pie slices
const PALETTE: [RGBColor; 5] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
];

/// Bar chart of total sales per product
///
/// # Arguments
/// * `sales` - Per-product totals, drawn left to right in the given order
/// * `output_path` - Path to save the PNG chart
pub fn render_sales_chart(sales: &[ProductSales], output_path: &Path) -> crate::Result<()> {
    if sales.is_empty() {
        warn!("no sales to chart, skipping {}", output_path.display());
        return Ok(());
    }

    let max_total = sales
        .iter()
        .map(|s| s.total_amount)
        .fold(0.0_f64, f64::max);
    let y_max = if max_total > 0.0 { max_total * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Total Sales by Product", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..sales.len() as u32).into_segmented(), 0f64..y_max)?;

    let label_for = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(i) => sales
            .get(*i as usize)
            .map(|s| s.name.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(sales.len())
        .x_label_formatter(&label_for)
        .x_desc("Product")
        .y_desc("Total Sales")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, s) in sales.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        chart.draw_series(
            Histogram::vertical(&chart)
                .style(color.filled())
                .margin(30)
                .data(std::iter::once((i as u32, s.total_amount))),
        )?;
    }

    root.present()?;
    info!("sales chart saved to {}", output_path.display());

    Ok(())
}

/// Pie chart of customers per segment with percentage labels
pub fn render_segment_chart(counts: &[(Segment, usize)], output_path: &Path) -> crate::Result<()> {
    if counts.iter().all(|(_, n)| *n == 0) {
        warn!("no customers to chart, skipping {}", output_path.display());
        return Ok(());
    }

    let root = BitMapBackend::new(output_path, (600, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Customer Segments", ("sans-serif", 30))?;

    let (width, height) = root.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;

    let sizes: Vec<f64> = counts.iter().map(|(_, n)| *n as f64).collect();
    let colors: Vec<RGBColor> = (0..counts.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect();
    let labels: Vec<String> = counts.iter().map(|(s, _)| s.to_string()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(140.0);
    pie.label_style(("sans-serif", 20).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 16).into_font().color(&WHITE));
    root.draw(&pie)?;

    root.present()?;
    info!("segment chart saved to {}", output_path.display());

    Ok(())
}
