//! Rendering of analysis results as JSON or CSV

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use sales_forecast::demand::{ClassificationMethod, DemandMap};
use sales_forecast::forecaster::{ForecastOutcome, FuturePoint, HistoricalPoint, ModelMetrics};
use sales_forecast::periods::{MonthCoverage, YearMonth};
use sales_forecast::summary::{
    CategorySales, CustomerSummary, HourSales, ProductSales, RepeatCustomer, SalesSummary,
    WeekdaySales,
};
use serde::Serialize;
use std::io::Write;

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Csv,
}

/// Forecast without the intermediate daily features
#[derive(Debug, Serialize)]
pub struct ForecastReport<'a> {
    pub metrics: &'a ModelMetrics,
    pub historical: &'a [HistoricalPoint],
    pub future: &'a [FuturePoint],
}

impl<'a> From<&'a ForecastOutcome> for ForecastReport<'a> {
    fn from(outcome: &'a ForecastOutcome) -> Self {
        Self {
            metrics: &outcome.metrics,
            historical: &outcome.historical,
            future: &outcome.future,
        }
    }
}

/// One CSV line of a forecast
#[derive(Debug, Serialize)]
struct ForecastRecord {
    date: NaiveDate,
    kind: &'static str,
    total_sales: Option<f64>,
    prediction: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub summary: SalesSummary,
    pub customers: CustomerSummary,
    pub categories: Vec<CategorySales>,
    pub top_products: Vec<ProductSales>,
    pub by_hour: Vec<HourSales>,
    pub by_weekday: Vec<WeekdaySales>,
    pub repeat_customers: Vec<RepeatCustomer>,
}

#[derive(Debug, Serialize)]
pub struct MonthsReport {
    pub months: Vec<MonthCoverage>,
    /// Newest month dense enough to be analysed on its own
    pub default_month: Option<YearMonth>,
}

pub fn write_forecast<W: Write>(out: W, outcome: &ForecastOutcome, format: Format) -> Result<()> {
    match format {
        Format::Json => write_json(out, &ForecastReport::from(outcome)),
        Format::Csv => {
            let historical = outcome.historical.iter().map(|p| ForecastRecord {
                date: p.date,
                kind: "historical",
                total_sales: Some(p.total_sales),
                prediction: p.prediction,
            });
            let future = outcome.future.iter().map(|p| ForecastRecord {
                date: p.date,
                kind: "future",
                total_sales: None,
                prediction: Some(p.prediction),
            });
            write_csv(out, historical.chain(future))
        }
    }
}

/// JSON carries the classification method; CSV only the cells
pub fn write_demand<W: Write>(out: W, demand: &DemandMap, format: Format) -> Result<()> {
    match format {
        Format::Json => write_json(out, demand),
        Format::Csv => write_csv(out, demand.cells.iter()),
    }
}

/// CSV holds the headline figures only
pub fn write_summary<W: Write>(out: W, report: &SummaryReport, format: Format) -> Result<()> {
    match format {
        Format::Json => write_json(out, report),
        Format::Csv => write_csv(out, std::iter::once(&report.summary)),
    }
}

pub fn write_months<W: Write>(out: W, report: &MonthsReport, format: Format) -> Result<()> {
    match format {
        Format::Json => write_json(out, report),
        Format::Csv => write_csv(out, report.months.iter()),
    }
}

pub fn method_label(method: Option<ClassificationMethod>) -> &'static str {
    match method {
        Some(ClassificationMethod::Clustering) => "clustering",
        Some(ClassificationMethod::QuantileFallback) => "quantile fallback",
        None => "none",
    }
}

fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value).context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}

fn write_csv<W, I, T>(out: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = T>,
    T: Serialize,
{
    let mut writer = csv::Writer::from_writer(out);
    for record in records {
        writer.serialize(record).context("Failed to write CSV record")?;
    }
    writer.flush()?;
    Ok(())
}
