//! Analysis period selection
//!
//! A period is either an explicit calendar month, the most recent month with
//! enough distinct days of data, or a trailing 90-day window ending at the
//! newest transaction in the slice.

use crate::data::Transaction;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Fewest distinct days for a month to be picked as the default
pub const MIN_DAYS_PER_MONTH: usize = 15;

/// Length of the trailing window in days
pub const TRAILING_WINDOW_DAYS: i64 = 90;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ForecastError::InvalidPeriod(format!(
                "Month must be within 1..=12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// Month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ForecastError::InvalidPeriod(format!("Expected YYYY-MM, got {:?}", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Period an analysis is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// An explicit month
    Month(YearMonth),
    /// The most recent month with at least [`MIN_DAYS_PER_MONTH`] days of data
    LastMonth,
    /// The trailing [`TRAILING_WINDOW_DAYS`] days up to the newest transaction
    Last90Days,
}

impl FromStr for Period {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ultimo_mes" | "last_month" => Ok(Period::LastMonth),
            "ultimos_90_dias" | "last_90_days" => Ok(Period::Last90Days),
            other => other.parse().map(Period::Month),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month(month) => month.fmt(f),
            Period::LastMonth => f.write_str("last_month"),
            Period::Last90Days => f.write_str("last_90_days"),
        }
    }
}

/// Coverage of one month in a slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCoverage {
    pub month: YearMonth,
    /// Distinct days with at least one transaction
    pub distinct_days: usize,
    pub total_sales: f64,
}

/// Months present in the slice, oldest first
pub fn available_months(transactions: &[Transaction]) -> Vec<MonthCoverage> {
    let mut months: BTreeMap<YearMonth, (BTreeSet<NaiveDate>, f64)> = BTreeMap::new();
    for t in transactions {
        let entry = months
            .entry(YearMonth::of(t.date))
            .or_insert_with(|| (BTreeSet::new(), 0.0));
        entry.0.insert(t.date);
        entry.1 += t.subtotal;
    }

    months
        .into_iter()
        .map(|(month, (days, total_sales))| MonthCoverage {
            month,
            distinct_days: days.len(),
            total_sales,
        })
        .collect()
}

/// Whether `month` has at least `min_days` distinct days of data
pub fn month_has_enough_data(transactions: &[Transaction], month: YearMonth, min_days: usize) -> bool {
    let days: BTreeSet<NaiveDate> = transactions
        .iter()
        .filter(|t| month.contains(t.date))
        .map(|t| t.date)
        .collect();
    days.len() >= min_days
}

/// Most recent month with at least `min_days` distinct days of data
pub fn default_month(transactions: &[Transaction], min_days: usize) -> Option<YearMonth> {
    available_months(transactions)
        .into_iter()
        .rev()
        .find(|m| m.distinct_days >= min_days)
        .map(|m| m.month)
}

/// Rows of `transactions` falling inside `period`
pub fn filter_by_period(transactions: &[Transaction], period: Period) -> Result<Vec<Transaction>> {
    let rows: Vec<Transaction> = match period {
        Period::Month(month) => select(transactions, |d| month.contains(d)),
        Period::LastMonth => {
            let month = default_month(transactions, MIN_DAYS_PER_MONTH).ok_or_else(|| {
                ForecastError::InvalidPeriod(format!(
                    "No month has at least {} days of data",
                    MIN_DAYS_PER_MONTH
                ))
            })?;
            select(transactions, |d| month.contains(d))
        }
        Period::Last90Days => match transactions.iter().map(|t| t.date).max() {
            Some(newest) => {
                let lower = newest - Duration::days(TRAILING_WINDOW_DAYS);
                select(transactions, |d| d >= lower)
            }
            None => Vec::new(),
        },
    };

    debug!(%period, input = transactions.len(), kept = rows.len(), "filtered by period");
    Ok(rows)
}

fn select<F>(transactions: &[Transaction], keep: F) -> Vec<Transaction>
where
    F: Fn(NaiveDate) -> bool,
{
    transactions
        .iter()
        .filter(|t| keep(t.date))
        .cloned()
        .collect()
}
