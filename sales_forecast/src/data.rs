//! Transaction data loading and coercion
//!
//! This module is the single place where raw columns are validated and
//! coerced. Everything downstream works on typed [`Transaction`] rows and
//! never re-coerces values.

use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Columns every transaction file must provide
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "invoice_id",
    "transaction_date",
    "transaction_time",
    "customer_id",
    "customer_name",
    "product_id",
    "product_name",
    "product_category",
    "product_quantity",
    "product_unit_price",
    "product_subtotal",
];

/// One itemized sales line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Invoice the line belongs to
    pub invoice_id: String,
    /// Calendar day of the sale
    pub date: NaiveDate,
    /// Time of day, when it could be read
    pub time: Option<NaiveTime>,
    /// Customer identifier, absent for anonymous sales
    pub customer_id: Option<String>,
    /// Customer display name
    pub customer_name: Option<String>,
    pub product_id: String,
    pub product_name: String,
    pub product_category: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Line subtotal, taken as given
    pub subtotal: f64,
}

impl Transaction {
    /// Create a line with only the fields the analytics need; product and
    /// customer details are left blank
    pub fn new(
        invoice_id: impl Into<String>,
        date: NaiveDate,
        time: Option<NaiveTime>,
        subtotal: f64,
    ) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            date,
            time,
            customer_id: None,
            customer_name: None,
            product_id: String::new(),
            product_name: String::new(),
            product_category: String::new(),
            quantity: 1.0,
            unit_price: subtotal,
            subtotal,
        }
    }

    /// Attach product details
    pub fn with_product(
        mut self,
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        product_category: impl Into<String>,
    ) -> Self {
        self.product_id = product_id.into();
        self.product_name = product_name.into();
        self.product_category = product_category.into();
        self
    }

    /// Attach a known customer
    pub fn with_customer(
        mut self,
        customer_id: impl Into<String>,
        customer_name: impl Into<String>,
    ) -> Self {
        self.customer_id = Some(customer_id.into());
        self.customer_name = Some(customer_name.into());
        self
    }

    /// Set quantity and unit price, keeping the given subtotal
    pub fn with_quantity(mut self, quantity: f64, unit_price: f64) -> Self {
        self.quantity = quantity;
        self.unit_price = unit_price;
        self
    }
}

/// Data loader for transaction tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load transactions from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df)
    }

    /// Load transactions from a Parquet file
    pub fn from_parquet<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
        let file = File::open(path)?;
        let df = ParquetReader::new(file).finish()?;

        Self::from_dataframe(&df)
    }

    /// Load by extension: `.parquet` files go through Parquet, anything else
    /// is read as CSV
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::from_parquet(path),
            _ => Self::from_csv(path),
        }
    }

    /// Convert an already loaded DataFrame into typed transactions
    pub fn from_dataframe(df: &DataFrame) -> Result<Vec<Transaction>> {
        Self::check_columns(df)?;

        let invoice_ids = string_column(df, "invoice_id")?;
        let dates = date_column(df, "transaction_date")?;
        let times = string_column(df, "transaction_time")?;
        let customer_ids = string_column(df, "customer_id")?;
        let customer_names = string_column(df, "customer_name")?;
        let product_ids = string_column(df, "product_id")?;
        let product_names = string_column(df, "product_name")?;
        let categories = string_column(df, "product_category")?;
        let quantities = numeric_column(df, "product_quantity")?;
        let unit_prices = numeric_column(df, "product_unit_price")?;
        let subtotals = numeric_column(df, "product_subtotal")?;

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let invoice_id = invoice_ids[i].clone().ok_or_else(|| {
                ForecastError::DataError(format!("Row {} has no invoice_id", i))
            })?;

            rows.push(Transaction {
                invoice_id,
                date: dates[i],
                time: times[i].as_deref().and_then(parse_time),
                customer_id: customer_ids[i].clone(),
                customer_name: customer_names[i].clone(),
                product_id: product_ids[i].clone().unwrap_or_default(),
                product_name: product_names[i].clone().unwrap_or_default(),
                product_category: categories[i].clone().unwrap_or_default(),
                quantity: quantities[i],
                unit_price: unit_prices[i],
                subtotal: subtotals[i],
            });
        }

        debug!(rows = rows.len(), "loaded transactions");
        Ok(rows)
    }

    /// Fail with the full list of missing columns
    fn check_columns(df: &DataFrame) -> Result<()> {
        let present = df.get_column_names();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !present.contains(c))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ForecastError::DataError(format!(
                "Missing columns: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Read a column as optional strings, whatever its stored type
fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let col = df.column(name)?.cast(&DataType::Utf8)?;
    let values = col
        .utf8()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect();
    Ok(values)
}

/// Read a column as f64; values that cannot be converted become 0.0
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let col = df.column(name)?;
    let col = match col.dtype() {
        DataType::Utf8 => {
            let parsed: Vec<Option<f64>> = col
                .utf8()?
                .into_iter()
                .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
                .collect();
            Series::new(name, parsed)
        }
        _ => col.cast(&DataType::Float64)?,
    };

    Ok(col
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
        .collect())
}

/// Read the date column; every row must hold a valid calendar date
fn date_column(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let col = df.column(name)?;
    match col.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            let days = col.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            let dates: Result<Vec<NaiveDate>> = days
                .i32()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    v.and_then(date_from_epoch_days).ok_or_else(|| {
                        ForecastError::DataError(format!("Row {} has no {}", i, name))
                    })
                })
                .collect();
            dates
        }
        _ => {
            let text = col.cast(&DataType::Utf8)?;
            let dates: Result<Vec<NaiveDate>> = text
                .utf8()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    v.and_then(parse_date).ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "Row {} has an invalid {}: {:?}",
                            i, name, v
                        ))
                    })
                })
                .collect();
            dates
        }
    }
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::Duration::days(days as i64))
}

/// Parse `YYYY-MM-DD`, tolerating a trailing time part
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Parse `HH:MM:SS` or `HH:MM`
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}
