//! Order x product incidence matrix for market basket analysis

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array2, ArrayView1};
use polars::prelude::*;
use tracing::debug;

/// Binary order x product table: `1` if the product appears in the order
#[derive(Debug, Clone, PartialEq)]
pub struct BasketMatrix {
    order_ids: Vec<String>,
    product_ids: Vec<String>,
    cells: Array2<u8>,
}

impl BasketMatrix {
    /// Pivot sales lines into a quantity matrix and binarize it
    ///
    /// Rows and columns are sorted by id. Order/product pairs that never
    /// occur are 0; any positive total quantity becomes 1.
    pub fn from_sales(sales: &DataFrame) -> crate::Result<Self> {
        let lines = sales
            .clone()
            .lazy()
            .group_by([col("order_id"), col("product_id")])
            .agg([col("quantity").sum().alias("quantity")])
            .collect()?;

        let order_col = lines.column("order_id")?.str()?;
        let product_col = lines.column("product_id")?.str()?;
        let quantity_col = lines.column("quantity")?.i64()?;

        let mut quantities: BTreeMap<(&str, &str), i64> = BTreeMap::new();
        let mut orders = BTreeSet::new();
        let mut products = BTreeSet::new();
        for ((order, product), quantity) in order_col
            .into_no_null_iter()
            .zip(product_col.into_no_null_iter())
            .zip(quantity_col.into_no_null_iter())
        {
            orders.insert(order);
            products.insert(product);
            *quantities.entry((order, product)).or_insert(0) += quantity;
        }

        let order_ids: Vec<String> = orders.iter().map(|s| s.to_string()).collect();
        let product_ids: Vec<String> = products.iter().map(|s| s.to_string()).collect();

        let mut cells = Array2::<u8>::zeros((order_ids.len(), product_ids.len()));
        for (i, order) in orders.iter().enumerate() {
            for (j, product) in products.iter().enumerate() {
                let quantity = quantities.get(&(*order, *product)).copied().unwrap_or(0);
                cells[[i, j]] = u8::from(quantity > 0);
            }
        }

        debug!(
            orders = order_ids.len(),
            products = product_ids.len(),
            "basket matrix built"
        );

        Ok(Self {
            order_ids,
            product_ids,
            cells,
        })
    }

    /// Build directly from ids and a 0/1 matrix; non-zero cells count as present
    pub fn from_parts(
        order_ids: Vec<String>,
        product_ids: Vec<String>,
        cells: Array2<u8>,
    ) -> crate::Result<Self> {
        anyhow::ensure!(
            cells.dim() == (order_ids.len(), product_ids.len()),
            "basket matrix shape {:?} does not match {} orders x {} products",
            cells.dim(),
            order_ids.len(),
            product_ids.len()
        );
        let cells = cells.mapv(|v| u8::from(v > 0));
        Ok(Self {
            order_ids,
            product_ids,
            cells,
        })
    }

    pub fn order_ids(&self) -> &[String] {
        &self.order_ids
    }

    pub fn product_ids(&self) -> &[String] {
        &self.product_ids
    }

    pub fn cells(&self) -> &Array2<u8> {
        &self.cells
    }

    pub fn n_orders(&self) -> usize {
        self.cells.nrows()
    }

    pub fn n_products(&self) -> usize {
        self.cells.ncols()
    }

    pub fn row(&self, order_id: &str) -> Option<ArrayView1<'_, u8>> {
        self.order_ids
            .iter()
            .position(|id| id == order_id)
            .map(|i| self.cells.row(i))
    }

    /// Fraction of orders that contain every product column in `items`
    pub fn support(&self, items: &[usize]) -> f64 {
        if self.n_orders() == 0 {
            return 0.0;
        }
        let hits = self
            .cells
            .outer_iter()
            .filter(|row| items.iter().all(|&j| row[j] == 1))
            .count();
        hits as f64 / self.n_orders() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sales_frame, Dataset};
    use ndarray::array;

    #[test]
    fn test_sample_basket_shape() {
        let dataset = Dataset::sample().unwrap();
        let basket = BasketMatrix::from_sales(&sales_frame(&dataset.orders).unwrap()).unwrap();

        assert_eq!(basket.order_ids(), &["O1", "O2", "O3", "O4"]);
        assert_eq!(basket.product_ids(), &["P1", "P2", "P3"]);
        assert_eq!(
            basket.cells(),
            &array![[1u8, 0, 0], [0, 0, 1], [0, 1, 0], [1, 0, 0]]
        );
    }

    #[test]
    fn test_order_row_lookup() {
        let dataset = Dataset::sample().unwrap();
        let basket = BasketMatrix::from_sales(&sales_frame(&dataset.orders).unwrap()).unwrap();

        let o4 = basket.row("O4").unwrap();
        assert_eq!(o4.to_vec(), vec![1u8, 0, 0]);
        assert!(basket.row("O9").is_none());
    }

    #[test]
    fn test_multi_line_orders_binarize() {
        let mut dataset = Dataset::sample().unwrap();
        // A second line for O1 with the same product and one with a new product
        let mut extra = dataset.orders[0].clone();
        extra.quantity = 5;
        dataset.orders.push(extra);
        let mut extra = dataset.orders[0].clone();
        extra.product_id = "P3".to_string();
        dataset.orders.push(extra);

        let basket = BasketMatrix::from_sales(&sales_frame(&dataset.orders).unwrap()).unwrap();
        assert_eq!(basket.n_orders(), 4);
        assert_eq!(basket.row("O1").unwrap().to_vec(), vec![1u8, 0, 1]);
    }

    #[test]
    fn test_support() {
        let dataset = Dataset::sample().unwrap();
        let basket = BasketMatrix::from_sales(&sales_frame(&dataset.orders).unwrap()).unwrap();

        assert_eq!(basket.support(&[0]), 0.5);
        assert_eq!(basket.support(&[1]), 0.25);
        assert_eq!(basket.support(&[0, 1]), 0.0);
    }

    #[test]
    fn test_from_parts_shape_mismatch() {
        let result = BasketMatrix::from_parts(
            vec!["O1".to_string()],
            vec!["P1".to_string(), "P2".to_string()],
            array![[1u8, 0, 1]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_basket() {
        let basket = BasketMatrix::from_sales(&sales_frame(&[]).unwrap()).unwrap();
        assert_eq!(basket.n_orders(), 0);
        assert_eq!(basket.n_products(), 0);
        assert_eq!(basket.support(&[]), 0.0);
    }
}
