//! SQLite-backed star-schema warehouse
//!
//! Every load replaces each table wholesale: the old table is dropped,
//! recreated from the frame's schema and refilled inside one transaction.

use std::path::Path;

use anyhow::Context;
use chrono::DateTime;
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::data::{self, Dataset};

pub const DIM_CUSTOMER: &str = "dim_customer";
pub const DIM_PRODUCT: &str = "dim_product";
pub const DIM_DATE: &str = "dim_date";
pub const FACT_SALES: &str = "fact_sales";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Row counts written by [`Warehouse::load_star_schema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub customers: usize,
    pub products: usize,
    pub dates: usize,
    pub sales: usize,
}

/// Handle to the warehouse database
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Open or create the warehouse file at `path`
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open warehouse {}", path.display()))?;
        debug!(path = %path.display(), "warehouse opened");
        Ok(Self { conn })
    }

    pub fn in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory warehouse")?;
        Ok(Self { conn })
    }

    /// Write the dimension and fact tables derived from `dataset`
    ///
    /// # Arguments
    /// * `dataset` - Seed customers, products and orders
    ///
    /// # Returns
    /// * `LoadSummary` with the number of rows written per table
    pub fn load_star_schema(&mut self, dataset: &Dataset) -> crate::Result<LoadSummary> {
        let customers = data::customers_frame(&dataset.customers)?;
        let products = data::products_frame(&dataset.products)?;
        let dates = data::date_dimension_frame(&dataset.orders)?;
        let sales = data::sales_frame(&dataset.orders)?;

        self.replace_table(DIM_CUSTOMER, &customers)?;
        self.replace_table(DIM_PRODUCT, &products)?;
        self.replace_table(DIM_DATE, &dates)?;
        self.replace_table(FACT_SALES, &sales)?;

        let summary = LoadSummary {
            customers: customers.height(),
            products: products.height(),
            dates: dates.height(),
            sales: sales.height(),
        };
        info!(
            customers = summary.customers,
            products = summary.products,
            dates = summary.dates,
            sales = summary.sales,
            "star schema loaded"
        );

        Ok(summary)
    }

    /// Drop `name` if present, then recreate it with the rows of `frame`
    pub fn replace_table(&mut self, name: &str, frame: &DataFrame) -> crate::Result<()> {
        let columns = frame.get_columns();
        let definition = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), sql_type(c.dtype())))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");

        let tx = self
            .conn
            .transaction()
            .with_context(|| format!("failed to begin replacing {name}"))?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)), [])
            .with_context(|| format!("failed to drop {name}"))?;
        tx.execute(
            &format!("CREATE TABLE {} ({definition})", quote_ident(name)),
            [],
        )
        .with_context(|| format!("failed to create {name}"))?;
        {
            let mut insert = tx
                .prepare(&format!(
                    "INSERT INTO {} VALUES ({placeholders})",
                    quote_ident(name)
                ))
                .with_context(|| format!("failed to prepare insert into {name}"))?;

            for row in 0..frame.height() {
                let values = columns
                    .iter()
                    .map(|c| c.get(row).map(sql_value))
                    .collect::<PolarsResult<Vec<_>>>()?;
                insert
                    .execute(params_from_iter(values))
                    .with_context(|| format!("failed to insert row {row} into {name}"))?;
            }
        }
        tx.commit()
            .with_context(|| format!("failed to commit {name}"))?;

        debug!(table = name, rows = frame.height(), "table replaced");
        Ok(())
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> crate::Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> crate::Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to count rows of {table}"))?;
        Ok(count as usize)
    }

    /// Every row of `table` in insertion order
    pub fn dump_table(&self, table: &str) -> crate::Result<Vec<Vec<Value>>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table)))
            .with_context(|| format!("failed to read {table}"))?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Boolean => "INTEGER",
        DataType::Datetime(_, _) => "TIMESTAMP",
        DataType::Date => "DATE",
        dt if dt.is_integer() => "INTEGER",
        dt if dt.is_float() => "REAL",
        _ => "TEXT",
    }
}

fn sql_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Integer(i64::from(v)),
        AnyValue::Int32(v) => Value::Integer(i64::from(v)),
        AnyValue::Int64(v) => Value::Integer(v),
        AnyValue::UInt32(v) => Value::Integer(i64::from(v)),
        AnyValue::Float32(v) => Value::Real(f64::from(v)),
        AnyValue::Float64(v) => Value::Real(v),
        AnyValue::String(v) => Value::Text(v.to_string()),
        AnyValue::StringOwned(v) => Value::Text(v.to_string()),
        AnyValue::Date(days) => Value::Text(format_date(days)),
        AnyValue::Datetime(v, unit, _) => Value::Text(format_datetime(v, unit)),
        other => Value::Text(other.to_string()),
    }
}

fn format_date(days: i32) -> String {
    DateTime::from_timestamp(i64::from(days) * 86_400, 0)
        .map(|d| d.date_naive().to_string())
        .unwrap_or_else(|| days.to_string())
}

fn format_datetime(value: i64, unit: TimeUnit) -> String {
    let datetime = match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
    };
    datetime
        .map(|d| d.naive_utc().format(DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string())
}
