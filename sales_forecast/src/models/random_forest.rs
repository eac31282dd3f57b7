//! Random forest regression over calendar features

use crate::error::Result;
use crate::models::{RegressionModel, TrainedRegressionModel};
use sales_math::{ForestConfig, RandomForestRegressor, TrainedForest};

/// Random forest regression model
#[derive(Debug, Clone)]
pub struct RandomForest {
    /// Name of the model
    name: String,
    regressor: RandomForestRegressor,
}

/// Trained random forest
#[derive(Debug, Clone)]
pub struct TrainedRandomForest {
    /// Name of the model
    name: String,
    forest: TrainedForest,
}

impl RandomForest {
    /// Create a new random forest model
    pub fn new(config: ForestConfig) -> Result<Self> {
        let name = format!(
            "Random Forest (trees={}, seed={})",
            config.n_estimators, config.seed
        );
        let regressor = RandomForestRegressor::new(config)?;
        Ok(Self { name, regressor })
    }

    /// Forest settings
    pub fn config(&self) -> &ForestConfig {
        self.regressor.config()
    }
}

impl RegressionModel for RandomForest {
    type Trained = TrainedRandomForest;

    fn train(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained> {
        let forest = self.regressor.fit(features, targets)?;
        Ok(TrainedRandomForest {
            name: self.name.clone(),
            forest,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedRegressionModel for TrainedRandomForest {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(self.forest.predict(features)?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedRandomForest {
    /// Number of trees in the ensemble
    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }
}
