//! # Sales Math
//!
//! Numerical kernels used by the sales analytics pipeline.
//! This crate provides descriptive statistics, feature standardisation,
//! seeded k-means clustering and a seeded random-forest regressor.

use thiserror::Error;

pub mod clustering;
pub mod forest;
pub mod stats;

pub use clustering::{KMeans, KMeansConfig, KMeansFit};
pub use forest::{ForestConfig, RandomForestRegressor, RegressionTree, TrainedForest, TreeParams};
pub use stats::{quantile, r_squared, Standardizer};

/// Errors that can occur in numerical calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Check that a feature matrix is non-empty and rectangular, returning its width
pub(crate) fn matrix_width(rows: &[Vec<f64>]) -> Result<usize> {
    let width = match rows.first() {
        Some(first) => first.len(),
        None => {
            return Err(MathError::InsufficientData(
                "Feature matrix has no rows".to_string(),
            ))
        }
    };

    if width == 0 {
        return Err(MathError::InvalidInput(
            "Feature matrix has no columns".to_string(),
        ));
    }

    if let Some(pos) = rows.iter().position(|r| r.len() != width) {
        return Err(MathError::InvalidInput(format!(
            "Row {} has {} features, expected {}",
            pos,
            rows[pos].len(),
            width
        )));
    }

    Ok(width)
}
