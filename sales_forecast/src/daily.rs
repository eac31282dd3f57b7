//! Daily aggregation of transaction lines

use crate::data::Transaction;
use crate::error::{ForecastError, Result};
use crate::features::CalendarFeatures;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One calendar day of sales with its calendar features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub total_sales: f64,
    #[serde(flatten)]
    pub features: CalendarFeatures,
}

/// Days with sales, unique and ascending; missing days are absent rather
/// than zero-filled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    rows: Vec<DailyRow>,
}

impl DailySeries {
    /// Aggregate transaction subtotals per day
    pub fn from_transactions(transactions: &[Transaction]) -> Result<Self> {
        Self::from_pairs(transactions.iter().map(|t| (t.date, t.subtotal)))
    }

    /// Aggregate (date, amount) pairs; duplicate dates are summed and the
    /// earliest date becomes the ordinal origin
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (date, amount) in pairs {
            if !amount.is_finite() {
                return Err(ForecastError::ValidationError(format!(
                    "Non-finite subtotal {} on {}",
                    amount, date
                )));
            }
            *totals.entry(date).or_insert(0.0) += amount;
        }

        let origin = match totals.keys().next() {
            Some(&first) => first,
            None => return Ok(Self::default()),
        };

        let rows = totals
            .into_iter()
            .map(|(date, total_sales)| DailyRow {
                date,
                total_sales,
                features: CalendarFeatures::derive(date, origin),
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[DailyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First observed date, the ordinal origin
    pub fn origin(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    /// Last observed date
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn totals(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.total_sales).collect()
    }

    /// Row-major feature matrix
    pub fn feature_matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.features.to_vec()).collect()
    }

    /// Export as a DataFrame; an empty series keeps the full schema
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            date_series("date", &self.dates())?,
            Series::new("total_sales", self.totals()),
            Series::new(
                "day_of_week",
                self.rows.iter().map(|r| r.features.day_of_week).collect::<Vec<u32>>(),
            ),
            Series::new(
                "is_weekend",
                self.rows.iter().map(|r| r.features.is_weekend).collect::<Vec<u32>>(),
            ),
            Series::new(
                "week_of_month",
                self.rows.iter().map(|r| r.features.week_of_month).collect::<Vec<u32>>(),
            ),
            Series::new(
                "day_of_month",
                self.rows.iter().map(|r| r.features.day_of_month).collect::<Vec<u32>>(),
            ),
            Series::new(
                "day_ordinal",
                self.rows.iter().map(|r| r.features.day_ordinal).collect::<Vec<i64>>(),
            ),
        ])?;
        Ok(df)
    }
}

/// Build a polars Date column from calendar dates
pub(crate) fn date_series(name: &str, dates: &[NaiveDate]) -> Result<Series> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| ForecastError::DataError("Invalid epoch".to_string()))?;
    let days: Vec<i32> = dates
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();
    Ok(Series::new(name, days).cast(&DataType::Date)?)
}
