//! Regression models for daily sales

use crate::error::Result;
use std::fmt::Debug;

/// Trained regression model
pub trait TrainedRegressionModel: Debug {
    /// Predict one value per feature row
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Regression model that can be trained on a feature matrix
pub trait RegressionModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedRegressionModel;

    /// Train the model on row-major features and their targets
    fn train(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod random_forest;

pub use random_forest::{RandomForest, TrainedRandomForest};
