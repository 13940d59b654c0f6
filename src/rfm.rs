//! RFM (Recency, Frequency, Monetary) scoring and segmentation

use std::fmt;

use polars::prelude::*;
use tracing::{debug, info};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Customer segment derived from recency and frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    HighValue,
    LowValue,
}

impl Segment {
    /// High-Value iff the customer ordered within two days and at least twice
    pub fn classify(recency: i64, frequency: i64) -> Self {
        if recency <= 2 && frequency >= 2 {
            Segment::HighValue
        } else {
            Segment::LowValue
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Segment::HighValue => "High-Value",
            Segment::LowValue => "Low-Value",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// RFM metrics for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRecord {
    pub customer_id: String,
    /// Whole days between the last order and the reference date
    pub recency: i64,
    /// Number of orders
    pub frequency: i64,
    /// Sum of order totals
    pub monetary: f64,
    pub segment: Segment,
}

/// Compute RFM metrics per customer from the sales fact frame
///
/// The reference date is one day after the latest order in the frame, so the
/// most recent customer always has a recency of at least one day.
///
/// # Arguments
/// * `sales` - Frame with `customer_id`, `order_id`, `order_datetime` and `total_amount`
///
/// # Returns
/// * One `RfmRecord` per customer with orders, sorted by customer id
pub fn compute_rfm(sales: &DataFrame) -> crate::Result<Vec<RfmRecord>> {
    let Some(latest) = latest_order_millis(sales)? else {
        debug!("no orders, skipping RFM");
        return Ok(Vec::new());
    };
    let reference = latest + MILLIS_PER_DAY;

    let rfm_df = sales
        .clone()
        .lazy()
        .group_by([col("customer_id")])
        .agg([
            col("order_datetime")
                .cast(DataType::Int64)
                .max()
                .alias("last_order"),
            col("order_id").count().cast(DataType::Int64).alias("frequency"),
            col("total_amount").sum().alias("monetary"),
        ])
        .with_column(
            (lit(reference) - col("last_order"))
                .floor_div(lit(MILLIS_PER_DAY))
                .alias("recency"),
        )
        .select([
            col("customer_id"),
            col("recency"),
            col("frequency"),
            col("monetary"),
        ])
        .sort(["customer_id"], SortMultipleOptions::default())
        .collect()?;

    let customer_ids = rfm_df.column("customer_id")?.str()?;
    let recency = rfm_df.column("recency")?.i64()?;
    let frequency = rfm_df.column("frequency")?.i64()?;
    let monetary = rfm_df.column("monetary")?.f64()?;

    let records: Vec<RfmRecord> = customer_ids
        .into_no_null_iter()
        .zip(recency.into_no_null_iter())
        .zip(frequency.into_no_null_iter())
        .zip(monetary.into_no_null_iter())
        .map(|(((customer_id, recency), frequency), monetary)| RfmRecord {
            customer_id: customer_id.to_string(),
            recency,
            frequency,
            monetary,
            segment: Segment::classify(recency, frequency),
        })
        .collect();

    info!(customers = records.len(), "RFM scores computed");
    Ok(records)
}

/// Customers per segment, largest segment first
pub fn segment_counts(records: &[RfmRecord]) -> Vec<(Segment, usize)> {
    let mut counts: Vec<(Segment, usize)> = [Segment::HighValue, Segment::LowValue]
        .into_iter()
        .map(|segment| {
            let n = records.iter().filter(|r| r.segment == segment).count();
            (segment, n)
        })
        .filter(|(_, n)| *n > 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts
}

fn latest_order_millis(sales: &DataFrame) -> crate::Result<Option<i64>> {
    let millis = sales.column("order_datetime")?.cast(&DataType::Int64)?;
    Ok(millis.i64()?.max())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sales_frame, Dataset};

    fn sample_rfm() -> Vec<RfmRecord> {
        let dataset = Dataset::sample().unwrap();
        let sales = sales_frame(&dataset.orders).unwrap();
        compute_rfm(&sales).unwrap()
    }

    #[test]
    fn test_sample_rfm_values() {
        let rfm = sample_rfm();
        assert_eq!(rfm.len(), 3);

        assert_eq!(
            rfm[0],
            RfmRecord {
                customer_id: "C1".to_string(),
                recency: 1,
                frequency: 2,
                monetary: 2350.0,
                segment: Segment::HighValue,
            }
        );
        assert_eq!(rfm[1].customer_id, "C2");
        assert_eq!(rfm[1].recency, 2);
        assert_eq!(rfm[1].frequency, 1);
        assert_eq!(rfm[1].monetary, 750.0);
        assert_eq!(rfm[1].segment, Segment::LowValue);

        assert_eq!(rfm[2].customer_id, "C3");
        assert_eq!(rfm[2].recency, 1);
        assert_eq!(rfm[2].frequency, 1);
        assert_eq!(rfm[2].segment, Segment::LowValue);
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(Segment::classify(2, 2), Segment::HighValue);
        assert_eq!(Segment::classify(0, 10), Segment::HighValue);
        assert_eq!(Segment::classify(3, 2), Segment::LowValue);
        assert_eq!(Segment::classify(1, 1), Segment::LowValue);
    }

    #[test]
    fn test_segment_labels() {
        assert_eq!(Segment::HighValue.to_string(), "High-Value");
        assert_eq!(Segment::LowValue.to_string(), "Low-Value");
    }

    #[test]
    fn test_segment_counts() {
        let counts = segment_counts(&sample_rfm());
        assert_eq!(counts, vec![(Segment::LowValue, 2), (Segment::HighValue, 1)]);
        assert!(segment_counts(&[]).is_empty());
    }

    #[test]
    fn test_recency_rounds_down_partial_days() {
        let mut dataset = Dataset::sample().unwrap();
        // Latest order 2025-09-12 18:30, so the reference is 2025-09-13 18:30
        dataset.orders[0].order_datetime =
            crate::data::parse_datetime("2025-09-10 18:31").unwrap();
        dataset.orders.retain(|o| o.order_id != "O3");
        let sales = sales_frame(&dataset.orders).unwrap();

        let rfm = compute_rfm(&sales).unwrap();
        // C1: 2 days 23 h 59 min before the reference
        assert_eq!(rfm[0].customer_id, "C1");
        assert_eq!(rfm[0].recency, 2);
        assert_eq!(rfm[0].frequency, 1);
        assert_eq!(rfm[0].segment, Segment::LowValue);
    }

    #[test]
    fn test_empty_sales() {
        let sales = sales_frame(&[]).unwrap();
        assert!(compute_rfm(&sales).unwrap().is_empty());
    }
}
