//! Seed tables and their Polars frame representations

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// A registered customer
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub city: String,
    pub signup_date: NaiveDate,
}

/// A catalogue product
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub retail_price: f64,
}

/// A single order line: one product bought by one customer
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub order_datetime: NaiveDateTime,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub discount: f64,
}

impl Order {
    /// Amount charged for the line after discount
    pub fn total_amount(&self) -> f64 {
        self.quantity as f64 * self.unit_price - self.discount
    }

    /// Calendar day the order was placed on
    pub fn date_id(&self) -> NaiveDate {
        self.order_datetime.date()
    }
}

/// The three seed tables the pipeline starts from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
}

impl Dataset {
    /// Built-in sample: three customers, three products, four orders
    pub fn sample() -> crate::Result<Self> {
        let customers = [
            ("C1", "Aarav", "Mumbai", "2025-01-05"),
            ("C2", "Meera", "Pune", "2025-02-10"),
            ("C3", "Karan", "Delhi", "2025-03-15"),
        ]
        .into_iter()
        .map(|(id, name, city, signup)| -> crate::Result<Customer> {
            Ok(Customer {
                customer_id: id.to_string(),
                name: name.to_string(),
                city: city.to_string(),
                signup_date: parse_date(signup)?,
            })
        })
        .collect::<crate::Result<Vec<_>>>()?;

        let products = [
            ("P1", "Arduino Uno", "Boards", 500.0),
            ("P2", "ESP32", "Boards", 450.0),
            ("P3", "Sensor Kit", "Sensors", 800.0),
        ]
        .into_iter()
        .map(|(id, name, category, price)| Product {
            product_id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            retail_price: price,
        })
        .collect();

        let orders = [
            ("O1", "2025-09-10 12:30", "C1", "P1", 2, 500.0, 0.0),
            ("O2", "2025-09-11 15:45", "C2", "P3", 1, 800.0, 50.0),
            ("O3", "2025-09-12 17:00", "C1", "P2", 3, 450.0, 0.0),
            ("O4", "2025-09-12 18:30", "C3", "P1", 1, 500.0, 0.0),
        ]
        .into_iter()
        .map(|(id, placed, customer, product, quantity, unit_price, discount)| {
            parse_datetime(placed).map(|order_datetime| Order {
                order_id: id.to_string(),
                order_datetime,
                customer_id: customer.to_string(),
                product_id: product.to_string(),
                quantity,
                unit_price,
                discount,
            })
        })
        .collect::<crate::Result<Vec<_>>>()?;

        Ok(Self {
            customers,
            products,
            orders,
        })
    }

    /// Load `customers.csv`, `products.csv` and `orders.csv` from a directory
    ///
    /// # Arguments
    /// * `dir` - Directory holding the three CSV files, each with a header row
    ///
    /// # Returns
    /// * `Dataset` with every row parsed, or an error naming the bad file and column
    pub fn from_csv_dir(dir: impl AsRef<Path>) -> crate::Result<Self> {
        let dir = dir.as_ref();

        let frame = read_csv(&dir.join("customers.csv"))?;
        let table = SourceTable::new("customers.csv", &frame);
        let customers = table
            .strings("customer_id")?
            .into_iter()
            .zip(table.strings("name")?)
            .zip(table.strings("city")?)
            .zip(table.strings("signup_date")?)
            .map(|(((customer_id, name), city), signup)| -> crate::Result<Customer> {
                Ok(Customer {
                    customer_id,
                    name,
                    city,
                    signup_date: parse_date(&signup)
                        .context("customers.csv: invalid `signup_date`")?,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let frame = read_csv(&dir.join("products.csv"))?;
        let table = SourceTable::new("products.csv", &frame);
        let products: Vec<Product> = table
            .strings("product_id")?
            .into_iter()
            .zip(table.strings("name")?)
            .zip(table.strings("category")?)
            .zip(table.floats("retail_price")?)
            .map(|(((product_id, name), category), retail_price)| Product {
                product_id,
                name,
                category,
                retail_price,
            })
            .collect();

        let frame = read_csv(&dir.join("orders.csv"))?;
        let table = SourceTable::new("orders.csv", &frame);
        let placed = table.strings("order_datetime")?;
        let customer_ids = table.strings("customer_id")?;
        let product_ids = table.strings("product_id")?;
        let quantities = table.integers("quantity")?;
        let unit_prices = table.floats("unit_price")?;
        let discounts = table.floats("discount")?;
        let orders = table
            .strings("order_id")?
            .into_iter()
            .enumerate()
            .map(|(row, order_id)| {
                parse_datetime(&placed[row])
                    .context("orders.csv: invalid `order_datetime`")
                    .map(|order_datetime| Order {
                        order_id,
                        order_datetime,
                        customer_id: customer_ids[row].clone(),
                        product_id: product_ids[row].clone(),
                        quantity: quantities[row],
                        unit_price: unit_prices[row],
                        discount: discounts[row],
                    })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        debug!(
            customers = customers.len(),
            products = products.len(),
            orders = orders.len(),
            dir = %dir.display(),
            "loaded seed tables from CSV"
        );

        Ok(Self {
            customers,
            products,
            orders,
        })
    }
}

/// Days from the earliest to the latest order date, inclusive
pub fn date_dimension(orders: &[Order]) -> Vec<NaiveDate> {
    let first = orders.iter().map(Order::date_id).min();
    let last = orders.iter().map(Order::date_id).max();
    match (first, last) {
        (Some(first), Some(last)) => first.iter_days().take_while(|day| *day <= last).collect(),
        _ => Vec::new(),
    }
}

pub fn customers_frame(customers: &[Customer]) -> crate::Result<DataFrame> {
    let frame = df!(
        "customer_id" => customers.iter().map(|c| c.customer_id.clone()).collect::<Vec<_>>(),
        "name" => customers.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
        "city" => customers.iter().map(|c| c.city.clone()).collect::<Vec<_>>(),
        "signup_date" => customers.iter().map(|c| epoch_days(c.signup_date)).collect::<Vec<_>>()
    )?
    .lazy()
    .with_column(col("signup_date").cast(DataType::Date))
    .collect()?;

    Ok(frame)
}

pub fn products_frame(products: &[Product]) -> crate::Result<DataFrame> {
    let frame = df!(
        "product_id" => products.iter().map(|p| p.product_id.clone()).collect::<Vec<_>>(),
        "name" => products.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
        "category" => products.iter().map(|p| p.category.clone()).collect::<Vec<_>>(),
        "retail_price" => products.iter().map(|p| p.retail_price).collect::<Vec<_>>()
    )?;

    Ok(frame)
}

/// Orders as a frame with `order_datetime` typed as a millisecond datetime
pub fn orders_frame(orders: &[Order]) -> crate::Result<DataFrame> {
    let frame = df!(
        "order_id" => orders.iter().map(|o| o.order_id.clone()).collect::<Vec<_>>(),
        "order_datetime" => orders
            .iter()
            .map(|o| o.order_datetime.and_utc().timestamp_millis())
            .collect::<Vec<_>>(),
        "customer_id" => orders.iter().map(|o| o.customer_id.clone()).collect::<Vec<_>>(),
        "product_id" => orders.iter().map(|o| o.product_id.clone()).collect::<Vec<_>>(),
        "quantity" => orders.iter().map(|o| o.quantity).collect::<Vec<_>>(),
        "unit_price" => orders.iter().map(|o| o.unit_price).collect::<Vec<_>>(),
        "discount" => orders.iter().map(|o| o.discount).collect::<Vec<_>>()
    )?
    .lazy()
    .with_column(
        col("order_datetime").cast(DataType::Datetime(TimeUnit::Milliseconds, None)),
    )
    .collect()?;

    Ok(frame)
}

/// Fact table rows: orders plus `total_amount` and `date_id`
pub fn sales_frame(orders: &[Order]) -> crate::Result<DataFrame> {
    let frame = orders_frame(orders)?
        .lazy()
        .with_columns([
            (col("quantity") * col("unit_price") - col("discount")).alias("total_amount"),
            col("order_datetime").cast(DataType::Date).alias("date_id"),
        ])
        .collect()?;

    Ok(frame)
}

pub fn date_dimension_frame(orders: &[Order]) -> crate::Result<DataFrame> {
    let days = date_dimension(orders);
    let frame = df!(
        "date_id" => days.iter().map(|d| epoch_days(*d)).collect::<Vec<_>>(),
        "year" => days.iter().map(|d| d.year()).collect::<Vec<_>>(),
        "month" => days.iter().map(|d| d.month() as i32).collect::<Vec<_>>(),
        "day" => days.iter().map(|d| d.day() as i32).collect::<Vec<_>>()
    )?
    .lazy()
    .with_column(col("date_id").cast(DataType::Date))
    .collect()?;

    Ok(frame)
}

pub fn parse_date(value: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .with_context(|| format!("invalid date: {value}"))
}

pub fn parse_datetime(value: &str) -> crate::Result<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .with_context(|| format!("invalid datetime: {value}"))
}

fn epoch_days(date: NaiveDate) -> i32 {
    date.signed_duration_since(DateTime::<Utc>::UNIX_EPOCH.date_naive())
        .num_days() as i32
}

/// Read every column as text; typed columns are converted by [`SourceTable`]
fn read_csv(path: &Path) -> crate::Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .and_then(|reader| reader.finish())
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Column accessors over a freshly read CSV frame, reporting the file name on error
struct SourceTable<'a> {
    file: &'a str,
    frame: &'a DataFrame,
}

impl<'a> SourceTable<'a> {
    fn new(file: &'a str, frame: &'a DataFrame) -> Self {
        Self { file, frame }
    }

    fn column(&self, name: &str, dtype: &DataType) -> crate::Result<Column> {
        self.frame
            .column(name)
            .with_context(|| format!("{}: missing column `{name}`", self.file))?
            .cast(dtype)
            .with_context(|| format!("{}: column `{name}` is not {dtype}", self.file))
    }

    fn missing(&self, name: &str, row: usize) -> anyhow::Error {
        anyhow::anyhow!("{}: missing or invalid `{name}` in row {}", self.file, row + 1)
    }

    fn strings(&self, name: &str) -> crate::Result<Vec<String>> {
        let column = self.column(name, &DataType::String)?;
        column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| value.map(str::to_string).ok_or_else(|| self.missing(name, row)))
            .collect()
    }

    fn floats(&self, name: &str) -> crate::Result<Vec<f64>> {
        let column = self.column(name, &DataType::Float64)?;
        column
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| value.ok_or_else(|| self.missing(name, row)))
            .collect()
    }

    fn integers(&self, name: &str) -> crate::Result<Vec<i64>> {
        let column = self.column(name, &DataType::Int64)?;
        column
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| value.ok_or_else(|| self.missing(name, row)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_sample_csvs(dir: &Path) {
        fs::write(
            dir.join("customers.csv"),
            "customer_id,name,city,signup_date\n\
             C1,Aarav,Mumbai,2025-01-05\n\
             C2,Meera,Pune,2025-02-10\n",
        )
        .unwrap();
        fs::write(
            dir.join("products.csv"),
            "product_id,name,category,retail_price\n\
             P1,Arduino Uno,Boards,500\n\
             P2,ESP32,Boards,450.5\n",
        )
        .unwrap();
        fs::write(
            dir.join("orders.csv"),
            "order_id,order_datetime,customer_id,product_id,quantity,unit_price,discount\n\
             O1,2025-09-10 12:30,C1,P1,2,500,0\n\
             O2,2025-09-11 15:45:10,C2,P2,1,450.5,0.5\n",
        )
        .unwrap();
    }

    #[test]
    fn test_sample_total_amounts() {
        let dataset = Dataset::sample().unwrap();
        let totals: Vec<f64> = dataset.orders.iter().map(Order::total_amount).collect();
        assert_eq!(totals, vec![1000.0, 750.0, 1350.0, 500.0]);
    }

    #[test]
    fn test_date_dimension_spans_order_days() {
        let dataset = Dataset::sample().unwrap();
        let days = date_dimension(&dataset.orders);
        assert_eq!(
            days,
            vec![
                parse_date("2025-09-10").unwrap(),
                parse_date("2025-09-11").unwrap(),
                parse_date("2025-09-12").unwrap(),
            ]
        );
        assert!(date_dimension(&[]).is_empty());
    }

    #[test]
    fn test_sales_frame_derived_columns() {
        let dataset = Dataset::sample().unwrap();
        let sales = sales_frame(&dataset.orders).unwrap();

        assert_eq!(sales.height(), 4);
        assert_eq!(sales.width(), 9);

        let totals: Vec<f64> = sales
            .column("total_amount")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(totals, vec![1000.0, 750.0, 1350.0, 500.0]);

        let date_id = sales.column("date_id").unwrap();
        assert_eq!(date_id.dtype(), &DataType::Date);
    }

    #[test]
    fn test_date_dimension_frame() {
        let dataset = Dataset::sample().unwrap();
        let frame = date_dimension_frame(&dataset.orders).unwrap();
        assert_eq!(frame.height(), 3);

        let days: Vec<i32> = frame
            .column("day")
            .unwrap()
            .i32()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(days, vec![10, 11, 12]);
    }

    #[test]
    fn test_parse_datetime_formats() {
        let minutes = parse_datetime("2025-09-10 12:30").unwrap();
        let seconds = parse_datetime("2025-09-10 12:30:00").unwrap();
        assert_eq!(minutes, seconds);
        assert!(parse_datetime("10/09/2025").is_err());
    }

    #[test]
    fn test_from_csv_dir() {
        let dir = tempdir().unwrap();
        write_sample_csvs(dir.path());

        let dataset = Dataset::from_csv_dir(dir.path()).unwrap();
        assert_eq!(dataset.customers.len(), 2);
        assert_eq!(dataset.products[1].retail_price, 450.5);
        assert_eq!(dataset.orders[1].discount, 0.5);
        assert_eq!(dataset.orders[1].total_amount(), 450.0);
        assert_eq!(
            dataset.orders[1].order_datetime,
            parse_datetime("2025-09-11 15:45:10").unwrap()
        );
    }

    #[test]
    fn test_from_csv_dir_missing_column() {
        let dir = tempdir().unwrap();
        write_sample_csvs(dir.path());
        fs::write(
            dir.path().join("products.csv"),
            "product_id,name,category\nP1,Arduino Uno,Boards\n",
        )
        .unwrap();

        let err = Dataset::from_csv_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("retail_price"));
    }

    #[test]
    fn test_from_csv_dir_keeps_numeric_looking_ids() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("customers.csv"),
            "customer_id,name,city,signup_date\n007,Aarav,Mumbai,2025-01-05\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("products.csv"),
            "product_id,name,category,retail_price\n01,Arduino Uno,Boards,500\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("orders.csv"),
            "order_id,order_datetime,customer_id,product_id,quantity,unit_price,discount\n\
             0001,2025-09-10 12:30,007,01,2,500,0\n",
        )
        .unwrap();

        let dataset = Dataset::from_csv_dir(dir.path()).unwrap();
        assert_eq!(dataset.customers[0].customer_id, "007");
        assert_eq!(dataset.products[0].product_id, "01");
        assert_eq!(dataset.orders[0].order_id, "0001");
        assert_eq!(dataset.orders[0].customer_id, "007");
        assert_eq!(dataset.orders[0].product_id, "01");
        assert_eq!(dataset.orders[0].quantity, 2);
        assert_eq!(dataset.orders[0].total_amount(), 1000.0);
    }

    #[test]
    fn test_from_csv_dir_invalid_number() {
        let dir = tempdir().unwrap();
        write_sample_csvs(dir.path());
        fs::write(
            dir.path().join("products.csv"),
            "product_id,name,category,retail_price\nP1,Arduino Uno,Boards,cheap\n",
        )
        .unwrap();

        let err = Dataset::from_csv_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("retail_price"));
    }

    #[test]
    fn test_from_csv_dir_missing_file() {
        let dir = tempdir().unwrap();
        assert!(Dataset::from_csv_dir(dir.path()).is_err());
    }
}
