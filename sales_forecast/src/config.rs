//! Analysis configuration
//!
//! Every field has a default, so a configuration file only needs to name the
//! settings it changes:
//!
//! ```json
//! { "forecast": { "horizon_days": 14 }, "demand": { "bucket_width_hours": 2 } }
//! ```

use crate::demand::DemandConfig;
use crate::error::Result;
use crate::forecaster::ForecastConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Settings for a whole analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub forecast: ForecastConfig,
    pub demand: DemandConfig,
    /// Products listed by the summary command
    pub top_products: Option<usize>,
    /// Fewest invoices for a customer to count as recurring
    pub min_visits: Option<usize>,
}

impl AnalysisConfig {
    /// Read a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!(path = %path.display(), "loaded analysis config");
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn top_products(&self) -> usize {
        self.top_products.unwrap_or(10)
    }

    pub fn min_visits(&self) -> usize {
        self.min_visits.unwrap_or(2)
    }
}
