//! Demand intensity by day of week and time of day
//!
//! Transactions are grouped into (weekday, time bucket) cells. Cells are then
//! labelled low / normal / peak, either by clustering their standardised
//! sales and transaction counts or, when there are too few distinct cells to
//! form three clusters, by tri-quantile thresholds on sales alone.

use crate::data::Transaction;
use crate::error::{ForecastError, Result};
use crate::features::{day_of_week, weekday_from_index, weekday_name};
use chrono::{NaiveTime, Timelike, Weekday};
use polars::prelude::*;
use sales_math::{quantile, KMeans, KMeansConfig, Standardizer};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Label of the bucket for rows without a readable time
pub const NO_TIME_LABEL: &str = "no time";

/// Number of demand levels
const LEVELS: usize = 3;

/// Demand classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandConfig {
    /// Width of a time bucket in hours
    pub bucket_width_hours: u32,
    /// Seed for the clustering initialisation
    pub seed: u64,
    /// Number of clustering initialisations
    pub n_init: usize,
    /// Maximum clustering iterations
    pub max_iter: usize,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            bucket_width_hours: 3,
            seed: 42,
            n_init: 1,
            max_iter: 300,
        }
    }
}

impl DemandConfig {
    /// Set bucket width
    pub fn bucket_width_hours(mut self, hours: u32) -> Self {
        self.bucket_width_hours = hours;
        self
    }

    /// Set random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Clustering settings derived from this configuration
    pub fn kmeans_config(&self) -> KMeansConfig {
        KMeansConfig::default()
            .k(LEVELS)
            .seed(self.seed)
            .n_init(self.n_init)
            .max_iter(self.max_iter)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=24).contains(&self.bucket_width_hours) {
            return Err(ForecastError::InvalidParameter(format!(
                "bucket_width_hours must be within 1..=24, got {}",
                self.bucket_width_hours
            )));
        }
        Ok(())
    }
}

/// A right-open range of hours, or the bucket for rows without a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeBucket {
    Hours { start: u32, end: u32 },
    NoTime,
}

impl TimeBucket {
    /// Bucket of `time` for buckets `width` hours wide; the last bucket of
    /// the day ends at 24
    pub fn for_time(time: Option<NaiveTime>, width: u32) -> Self {
        match time {
            Some(t) => {
                let start = (t.hour() / width) * width;
                TimeBucket::Hours {
                    start,
                    end: (start + width).min(24),
                }
            }
            None => TimeBucket::NoTime,
        }
    }

    /// First hour of the bucket
    pub fn start_hour(&self) -> Option<u32> {
        match self {
            TimeBucket::Hours { start, .. } => Some(*start),
            TimeBucket::NoTime => None,
        }
    }

    /// `"HH:00-HH:00"`, or [`NO_TIME_LABEL`]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBucket::Hours { start, end } => write!(f, "{:02}:00-{:02}:00", start, end),
            TimeBucket::NoTime => f.write_str(NO_TIME_LABEL),
        }
    }
}

impl Ord for TimeBucket {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TimeBucket::Hours { start: a, end: x }, TimeBucket::Hours { start: b, end: y }) => {
                a.cmp(b).then(x.cmp(y))
            }
            (TimeBucket::Hours { .. }, TimeBucket::NoTime) => Ordering::Less,
            (TimeBucket::NoTime, TimeBucket::Hours { .. }) => Ordering::Greater,
            (TimeBucket::NoTime, TimeBucket::NoTime) => Ordering::Equal,
        }
    }
}

impl PartialOrd for TimeBucket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for TimeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Demand intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    Low,
    Normal,
    Peak,
}

impl DemandLevel {
    /// Level for a cluster rank, 0 being the lowest mean sales
    fn from_rank(rank: usize) -> Self {
        match rank {
            0 => DemandLevel::Low,
            1 => DemandLevel::Normal,
            _ => DemandLevel::Peak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DemandLevel::Low => "low",
            DemandLevel::Normal => "normal",
            DemandLevel::Peak => "peak",
        }
    }
}

impl fmt::Display for DemandLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the levels of a demand map were assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Clustering,
    QuantileFallback,
}

/// Sales aggregated over one (weekday, bucket) cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellAggregate {
    #[serde(serialize_with = "serialize_weekday")]
    pub day: Weekday,
    pub bucket: TimeBucket,
    pub total_sales: f64,
    /// Distinct invoices in the cell
    pub transactions: usize,
}

/// A labelled demand cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandCell {
    #[serde(serialize_with = "serialize_weekday")]
    pub day: Weekday,
    pub bucket: TimeBucket,
    pub total_sales: f64,
    pub transactions: usize,
    pub level: DemandLevel,
}

fn serialize_weekday<S: Serializer>(day: &Weekday, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(weekday_name(*day))
}

/// Labelled cells, Monday first, then by bucket start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandMap {
    pub cells: Vec<DemandCell>,
    /// `None` when there were no cells to classify
    pub method: Option<ClassificationMethod>,
}

impl DemandMap {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Cells carrying `level`
    pub fn cells_with_level(&self, level: DemandLevel) -> impl Iterator<Item = &DemandCell> {
        self.cells.iter().filter(move |c| c.level == level)
    }

    /// Export as a DataFrame; an empty map keeps the full schema
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Series::new(
                "day",
                self.cells.iter().map(|c| weekday_name(c.day)).collect::<Vec<&str>>(),
            ),
            Series::new(
                "time_bucket",
                self.cells.iter().map(|c| c.bucket.label()).collect::<Vec<String>>(),
            ),
            Series::new(
                "total_sales",
                self.cells.iter().map(|c| c.total_sales).collect::<Vec<f64>>(),
            ),
            Series::new(
                "transactions",
                self.cells.iter().map(|c| c.transactions as u64).collect::<Vec<u64>>(),
            ),
            Series::new(
                "demand_level",
                self.cells.iter().map(|c| c.level.as_str()).collect::<Vec<&str>>(),
            ),
        ])?)
    }
}

/// Group transactions into (weekday, bucket) cells, Monday first then by
/// bucket start with the no-time bucket last
pub fn bucket_transactions(transactions: &[Transaction], width: u32) -> Result<Vec<CellAggregate>> {
    if !(1..=24).contains(&width) {
        return Err(ForecastError::InvalidParameter(format!(
            "bucket width must be within 1..=24, got {}",
            width
        )));
    }

    let mut cells: BTreeMap<(u32, TimeBucket), (f64, BTreeSet<&str>)> = BTreeMap::new();
    for t in transactions {
        if !t.subtotal.is_finite() {
            return Err(ForecastError::ValidationError(format!(
                "Non-finite subtotal on invoice {}",
                t.invoice_id
            )));
        }
        let key = (day_of_week(t.date), TimeBucket::for_time(t.time, width));
        let entry = cells.entry(key).or_insert_with(|| (0.0, BTreeSet::new()));
        entry.0 += t.subtotal;
        entry.1.insert(t.invoice_id.as_str());
    }

    Ok(cells
        .into_iter()
        .map(|((day, bucket), (total_sales, invoices))| CellAggregate {
            day: weekday_from_index(day),
            bucket,
            total_sales,
            transactions: invoices.len(),
        })
        .collect())
}

/// Assign a demand level to every cell
pub fn classify_cells(
    cells: &[CellAggregate],
    config: &DemandConfig,
) -> Result<(Vec<DemandLevel>, Option<ClassificationMethod>)> {
    if cells.is_empty() {
        return Ok((Vec::new(), None));
    }

    let distinct_points: HashSet<(u64, usize)> = cells
        .iter()
        .map(|c| (c.total_sales.to_bits(), c.transactions))
        .collect();

    if cells.len() >= LEVELS && distinct_points.len() >= LEVELS {
        if let Some(levels) = cluster_levels(cells, config)? {
            return Ok((levels, Some(ClassificationMethod::Clustering)));
        }
        warn!(cells = cells.len(), "clustering left a level empty, using quantile thresholds");
    } else if cells.len() >= LEVELS {
        warn!(
            cells = cells.len(),
            distinct = distinct_points.len(),
            "too few distinct cells to cluster, using quantile thresholds"
        );
    }

    let levels = quantile_levels(cells)?;
    Ok((levels, Some(ClassificationMethod::QuantileFallback)))
}

/// k-means on standardised (sales, transactions); clusters are ranked by
/// their mean sales so the raw cluster ids never leak into the labels.
/// Returns `None` if a cluster ends up without members.
fn cluster_levels(cells: &[CellAggregate], config: &DemandConfig) -> Result<Option<Vec<DemandLevel>>> {
    let points: Vec<Vec<f64>> = cells
        .iter()
        .map(|c| vec![c.total_sales, c.transactions as f64])
        .collect();
    let (_, scaled) = Standardizer::fit_transform(&points)?;
    let fit = KMeans::new(config.kmeans_config())?.fit(&scaled)?;

    let mut means = Vec::with_capacity(LEVELS);
    for cluster in 0..LEVELS {
        let members = fit.cluster_members(cluster);
        if members.is_empty() {
            return Ok(None);
        }
        let sales: f64 = members.iter().map(|&i| cells[i].total_sales).sum();
        means.push(sales / members.len() as f64);
    }

    let mut order: Vec<usize> = (0..LEVELS).collect();
    order.sort_by(|&a, &b| means[a].total_cmp(&means[b]));

    let mut level_of_cluster = [DemandLevel::Low; LEVELS];
    for (rank, &cluster) in order.iter().enumerate() {
        level_of_cluster[cluster] = DemandLevel::from_rank(rank);
    }
    debug!(?means, iterations = fit.n_iter, "clustered demand cells");

    Ok(Some(
        fit.labels.iter().map(|&label| level_of_cluster[label]).collect(),
    ))
}

/// Tri-quantile thresholds on sales: `<= q(1/3)` is low, `<= q(2/3)` is
/// normal, anything above is peak. Equal values all fall on the first
/// boundary and are labelled low.
fn quantile_levels(cells: &[CellAggregate]) -> Result<Vec<DemandLevel>> {
    let sales: Vec<f64> = cells.iter().map(|c| c.total_sales).collect();
    let low_cut = quantile(&sales, 1.0 / 3.0)?;
    let normal_cut = quantile(&sales, 2.0 / 3.0)?;

    Ok(sales
        .iter()
        .map(|&v| {
            if v <= low_cut {
                DemandLevel::Low
            } else if v <= normal_cut {
                DemandLevel::Normal
            } else {
                DemandLevel::Peak
            }
        })
        .collect())
}

/// Demand pattern detector
#[derive(Debug, Clone)]
pub struct DemandDetector {
    config: DemandConfig,
}

impl DemandDetector {
    /// Create a new detector
    pub fn new(config: DemandConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &DemandConfig {
        &self.config
    }

    /// Bucket and label the given transactions
    pub fn detect(&self, transactions: &[Transaction]) -> Result<DemandMap> {
        let aggregates = bucket_transactions(transactions, self.config.bucket_width_hours)?;
        let (levels, method) = classify_cells(&aggregates, &self.config)?;
        debug!(cells = aggregates.len(), ?method, "classified demand cells");

        let cells = aggregates
            .into_iter()
            .zip(levels)
            .map(|(a, level)| DemandCell {
                day: a.day,
                bucket: a.bucket,
                total_sales: a.total_sales,
                transactions: a.transactions,
                level,
            })
            .collect();

        Ok(DemandMap { cells, method })
    }
}
