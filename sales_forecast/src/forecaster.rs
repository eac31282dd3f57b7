//! Daily sales forecasting
//!
//! A forecast invocation aggregates the slice it is given into daily totals,
//! fits a model on the oldest days, scores it on the most recent ones, then
//! refits on the whole history to backfill and extrapolate. Models are never
//! reused across invocations.

use crate::daily::{date_series, DailySeries};
use crate::data::Transaction;
use crate::error::{ForecastError, Result};
use crate::features::CalendarFeatures;
use crate::models::{RandomForest, RegressionModel, TrainedRegressionModel};
use crate::utils::{future_dates, train_test_split_index};
use chrono::NaiveDate;
use polars::prelude::*;
use sales_math::{r_squared, ForestConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fewest distinct days a model is trained on
pub const MIN_HISTORY_DAYS: usize = 21;

/// Forecast settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of future days to predict
    pub horizon_days: usize,
    /// Share of the most recent days held out for scoring
    pub test_fraction: f64,
    /// Seed for the ensemble
    pub seed: u64,
    /// Number of trees in the ensemble
    pub n_estimators: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            test_fraction: 0.2,
            seed: 42,
            n_estimators: 200,
        }
    }
}

impl ForecastConfig {
    /// Set forecast horizon
    pub fn horizon_days(mut self, horizon_days: usize) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    /// Set held-out share
    pub fn test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Set random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set number of trees
    pub fn n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Forest settings derived from this configuration
    pub fn forest_config(&self) -> ForestConfig {
        ForestConfig::default()
            .n_estimators(self.n_estimators)
            .seed(self.seed)
    }

    fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "test_fraction must be strictly between 0 and 1, got {}",
                self.test_fraction
            )));
        }
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whether a model could be trained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStatus {
    Trained,
    InsufficientData,
}

/// A historical day with the refit model's prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub total_sales: f64,
    /// Absent when no model was trained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
}

/// A predicted future day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturePoint {
    pub date: NaiveDate,
    pub prediction: f64,
}

/// Model diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Coefficient of determination on the held-out days
    pub accuracy: Option<f64>,
    /// Distinct days in the history
    pub n_days: usize,
    pub message: String,
    pub status: ForecastStatus,
}

/// Everything one forecast invocation produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutcome {
    /// Daily aggregate with calendar features
    pub daily: DailySeries,
    pub historical: Vec<HistoricalPoint>,
    pub future: Vec<FuturePoint>,
    pub metrics: ModelMetrics,
}

impl ForecastOutcome {
    /// True when a model was trained and predictions exist
    pub fn is_trained(&self) -> bool {
        self.metrics.status == ForecastStatus::Trained
    }

    /// Historical rows as a DataFrame; the prediction column only exists
    /// when a model was trained
    pub fn historical_frame(&self) -> Result<DataFrame> {
        let dates: Vec<NaiveDate> = self.historical.iter().map(|p| p.date).collect();
        let mut columns = vec![
            date_series("date", &dates)?,
            Series::new(
                "total_sales",
                self.historical.iter().map(|p| p.total_sales).collect::<Vec<f64>>(),
            ),
        ];
        if self.is_trained() {
            columns.push(Series::new(
                "prediction",
                self.historical.iter().map(|p| p.prediction).collect::<Vec<Option<f64>>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Future rows as a DataFrame; empty but fully typed when no model was trained
    pub fn future_frame(&self) -> Result<DataFrame> {
        let dates: Vec<NaiveDate> = self.future.iter().map(|p| p.date).collect();
        Ok(DataFrame::new(vec![
            date_series("date", &dates)?,
            Series::new(
                "prediction",
                self.future.iter().map(|p| p.prediction).collect::<Vec<f64>>(),
            ),
        ])?)
    }
}

/// Daily sales forecaster
#[derive(Debug, Clone)]
pub struct SalesForecaster<M: RegressionModel = RandomForest> {
    config: ForecastConfig,
    model: M,
}

impl SalesForecaster<RandomForest> {
    /// Create a forecaster backed by a random forest
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        let model = RandomForest::new(config.forest_config())?;
        Self::with_model(config, model)
    }
}

impl<M: RegressionModel> SalesForecaster<M> {
    /// Create a forecaster with a custom regression model
    pub fn with_model(config: ForecastConfig, model: M) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, model })
    }

    /// Configuration in use
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast from raw transaction lines
    pub fn forecast(&self, transactions: &[Transaction]) -> Result<ForecastOutcome> {
        let daily = DailySeries::from_transactions(transactions)?;
        self.forecast_daily(daily)
    }

    /// Forecast from an existing daily aggregate
    pub fn forecast_daily(&self, daily: DailySeries) -> Result<ForecastOutcome> {
        let n_days = daily.len();
        debug!(n_days, model = self.model.name(), "building daily forecast");

        let (origin, last_date) = match (daily.origin(), daily.last_date()) {
            (Some(origin), Some(last)) if n_days >= MIN_HISTORY_DAYS => (origin, last),
            _ => {
                info!(n_days, "not enough history to train a forecast model");
                return Ok(Self::insufficient(daily));
            }
        };

        let features = daily.feature_matrix();
        let targets = daily.totals();

        // Score on the most recent days with a model that never saw them
        let split = train_test_split_index(n_days, self.config.test_fraction)?;
        let accuracy = {
            let holdout_model = self.model.train(&features[..split], &targets[..split])?;
            let holdout_predictions = holdout_model.predict(&features[split..])?;
            r_squared(&targets[split..], &holdout_predictions)?
        };

        // Refit on everything for the predictions that are returned
        let model = self.model.train(&features, &targets)?;
        let fitted = model.predict(&features)?;

        let horizon = future_dates(last_date, self.config.horizon_days);
        let future_features: Vec<Vec<f64>> = horizon
            .iter()
            .map(|&date| CalendarFeatures::derive(date, origin).to_vec())
            .collect();
        let future_predictions = model.predict(&future_features)?;

        info!(
            n_days,
            train_days = split,
            test_days = n_days - split,
            accuracy,
            "trained daily sales model"
        );

        let historical = daily
            .rows()
            .iter()
            .zip(fitted)
            .map(|(row, prediction)| HistoricalPoint {
                date: row.date,
                total_sales: row.total_sales,
                prediction: Some(prediction),
            })
            .collect();

        let future = horizon
            .into_iter()
            .zip(future_predictions)
            .map(|(date, prediction)| FuturePoint { date, prediction })
            .collect();

        Ok(ForecastOutcome {
            daily,
            historical,
            future,
            metrics: ModelMetrics {
                accuracy: Some(accuracy),
                n_days,
                message: "Model trained successfully.".to_string(),
                status: ForecastStatus::Trained,
            },
        })
    }

    fn insufficient(daily: DailySeries) -> ForecastOutcome {
        let n_days = daily.len();
        let historical = daily
            .rows()
            .iter()
            .map(|row| HistoricalPoint {
                date: row.date,
                total_sales: row.total_sales,
                prediction: None,
            })
            .collect();

        ForecastOutcome {
            daily,
            historical,
            future: Vec::new(),
            metrics: ModelMetrics {
                accuracy: None,
                n_days,
                message: format!(
                    "Insufficient data for training: at least {} days are required, got {}.",
                    MIN_HISTORY_DAYS, n_days
                ),
                status: ForecastStatus::InsufficientData,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(SalesForecaster::new(ForecastConfig::default().test_fraction(0.0)).is_err());
        assert!(SalesForecaster::new(ForecastConfig::default().test_fraction(1.0)).is_err());
        let err = SalesForecaster::new(ForecastConfig::default().n_estimators(0)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
        assert!(SalesForecaster::new(ForecastConfig::default()).is_ok());
    }

    #[test]
    fn test_forest_config_follows_seed() {
        let config = ForecastConfig::default().seed(7).n_estimators(12);
        let forest = config.forest_config();
        assert_eq!(forest.seed, 7);
        assert_eq!(forest.n_estimators, 12);
    }
}
