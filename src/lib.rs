//! # iasights
//!
//! Umbrella crate for the iasights workspace. It re-exports the analytics
//! library and its numerical kernels so downstream code can depend on a
//! single crate.
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use iasights_workspace::sales_forecast::{detect_demand_patterns, DemandLevel, Transaction};
//!
//! let date = NaiveDate::from_ymd_opt(2025, 11, 7).unwrap();
//! let rows = vec![Transaction::new("F1", date, None, 500.0)];
//! let demand = detect_demand_patterns(&rows).unwrap();
//! assert_eq!(demand.cells[0].level, DemandLevel::Low);
//! ```

pub use sales_forecast;
pub use sales_math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexported_defaults() {
        assert_eq!(sales_forecast::MIN_HISTORY_DAYS, 21);
        assert_eq!(sales_math::ForestConfig::default().n_estimators, 200);
    }
}
