//! # Sales Forecast
//!
//! Sales analytics over itemized point-of-sale transactions.
//!
//! ## Features
//!
//! - Transaction loading from CSV files or polars DataFrames
//! - Daily aggregation with calendar features
//! - Daily sales forecasting with a seeded random forest, scored on a
//!   chronological holdout
//! - Demand classification per weekday and time bucket (low / normal / peak)
//! - Period selection and descriptive summaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sales_forecast::data::DataLoader;
//! use sales_forecast::periods::{filter_by_period, Period};
//! use sales_forecast::{detect_demand_patterns, forecast};
//!
//! # fn main() -> sales_forecast::Result<()> {
//! let rows = DataLoader::from_csv("sales.csv")?;
//! let rows = filter_by_period(&rows, "last_90_days".parse::<Period>()?)?;
//!
//! let outcome = forecast(&rows, 7)?;
//! println!("accuracy: {:?}", outcome.metrics.accuracy);
//!
//! let demand = detect_demand_patterns(&rows)?;
//! for cell in &demand.cells {
//!     println!("{} {} {}", cell.day, cell.bucket, cell.level);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod daily;
pub mod data;
pub mod demand;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod models;
pub mod periods;
pub mod summary;
pub mod utils;

// Re-export commonly used types
pub use crate::config::AnalysisConfig;
pub use crate::daily::{DailyRow, DailySeries};
pub use crate::data::{DataLoader, Transaction};
pub use crate::demand::{DemandCell, DemandConfig, DemandDetector, DemandLevel, DemandMap, TimeBucket};
pub use crate::error::{ForecastError, Result};
pub use crate::features::CalendarFeatures;
pub use crate::forecaster::{
    ForecastConfig, ForecastOutcome, ForecastStatus, SalesForecaster, MIN_HISTORY_DAYS,
};
pub use crate::models::{RegressionModel, TrainedRegressionModel};
pub use crate::periods::{Period, YearMonth};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Forecast `horizon_days` of daily sales with the default random forest
pub fn forecast(transactions: &[Transaction], horizon_days: usize) -> Result<ForecastOutcome> {
    SalesForecaster::new(ForecastConfig::default().horizon_days(horizon_days))?
        .forecast(transactions)
}

/// Classify demand per weekday and three-hour bucket with default settings
pub fn detect_demand_patterns(transactions: &[Transaction]) -> Result<DemandMap> {
    DemandDetector::new(DemandConfig::default())?.detect(transactions)
}
