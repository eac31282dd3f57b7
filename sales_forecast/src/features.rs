//! Calendar features derived from a date
//!
//! The forecaster and the demand bucketer both read day-of-week from here so
//! the two never disagree on calendar semantics.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Feature names in the order [`CalendarFeatures::to_vec`] emits them
pub const FEATURE_NAMES: [&str; 5] = [
    "day_of_week",
    "is_weekend",
    "week_of_month",
    "day_of_month",
    "day_ordinal",
];

/// Calendar features of one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// 0 = Monday ... 6 = Sunday
    pub day_of_week: u32,
    /// 1 on Saturday and Sunday
    pub is_weekend: u32,
    /// ((day_of_month - 1) / 7) + 1, in 1..=5
    pub week_of_month: u32,
    pub day_of_month: u32,
    /// Days elapsed since the series origin
    pub day_ordinal: i64,
}

impl CalendarFeatures {
    /// Compute the features of `date` relative to `origin`
    pub fn derive(date: NaiveDate, origin: NaiveDate) -> Self {
        let day_of_week = day_of_week(date);
        let day_of_month = date.day();

        Self {
            day_of_week,
            is_weekend: u32::from(day_of_week >= 5),
            week_of_month: (day_of_month - 1) / 7 + 1,
            day_of_month,
            day_ordinal: (date - origin).num_days(),
        }
    }

    /// Feature vector in [`FEATURE_NAMES`] order
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.day_of_week as f64,
            self.is_weekend as f64,
            self.week_of_month as f64,
            self.day_of_month as f64,
            self.day_ordinal as f64,
        ]
    }
}

/// Monday-based day-of-week index
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// Weekday for a Monday-based index, wrapping past Sunday
pub fn weekday_from_index(index: u32) -> Weekday {
    match index % 7 {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// English day name
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
