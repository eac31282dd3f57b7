//! Descriptive statistics and goodness-of-fit measures

use crate::{matrix_width, MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Quantile of `values` using linear interpolation between closest ranks.
///
/// For `n` sorted values the position is `(n - 1) * q`; the result interpolates
/// between the values on either side of that position. With a single value, or
/// with all values equal, every quantile is that value.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute a quantile of an empty sample".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be within [0, 1], got {}",
            q
        )));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::InvalidInput(
            "Sample contains NaN values".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Coefficient of determination of `predicted` against `actual`.
///
/// When the actual values have no variance the score is 1.0 for a perfect
/// prediction and 0.0 otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.len() != predicted.len() {
        return Err(MathError::InvalidInput(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot score an empty sample".to_string(),
        ));
    }

    let mean = actual.iter().mean();
    let ss_total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_residual: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_total == 0.0 {
        return Ok(if ss_residual == 0.0 { 1.0 } else { 0.0 });
    }

    Ok(1.0 - ss_residual / ss_total)
}

/// Column-wise z-score standardisation.
///
/// Scales use the population standard deviation. A column without variance
/// keeps a scale of 1.0 so it is only centred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    /// Learn per-column means and scales from a row-major matrix
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = matrix_width(rows)?;
        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);

        for col in 0..width {
            let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
            if column.iter().any(|v| !v.is_finite()) {
                return Err(MathError::InvalidInput(format!(
                    "Column {} contains non-finite values",
                    col
                )));
            }

            let mean = column.iter().mean();
            let std_dev = column.iter().population_std_dev();

            means.push(mean);
            scales.push(if std_dev > 0.0 { std_dev } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    /// Apply the learned transformation
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let width = matrix_width(rows)?;
        if width != self.means.len() {
            return Err(MathError::InvalidInput(format!(
                "Expected {} columns, got {}",
                self.means.len(),
                width
            )));
        }

        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(self.scales.iter()))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect())
    }

    /// Fit and transform in one step
    pub fn fit_transform(rows: &[Vec<f64>]) -> Result<(Self, Vec<Vec<f64>>)> {
        let scaler = Self::fit(rows)?;
        let scaled = scaler.transform(rows)?;
        Ok((scaler, scaled))
    }

    /// Per-column means
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Per-column scales
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}
