//! Utility functions for the sales_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};

/// Chronological train/test split point.
///
/// The test suffix holds `ceil(len * test_ratio)` items; the function returns
/// the number of items in the training prefix. Nothing is shuffled.
pub fn train_test_split_index(len: usize, test_ratio: f64) -> Result<usize> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Test ratio must be strictly between 0 and 1, got {}",
            test_ratio
        )));
    }

    let test_size = (len as f64 * test_ratio).ceil() as usize;
    if test_size == 0 || test_size >= len {
        return Err(ForecastError::InvalidParameter(format!(
            "Test ratio {} leaves an empty split for {} observations",
            test_ratio, len
        )));
    }

    Ok(len - test_size)
}

/// Split a slice into a training prefix and a test suffix
pub fn train_test_split<T: Clone>(data: &[T], test_ratio: f64) -> Result<(Vec<T>, Vec<T>)> {
    let train_size = train_test_split_index(data.len(), test_ratio)?;
    Ok((data[..train_size].to_vec(), data[train_size..].to_vec()))
}

/// The `horizon` consecutive calendar days following `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|offset| last_date + Duration::days(offset))
        .collect()
}
