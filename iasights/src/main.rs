//! # iasights
//!
//! Command-line front end for the sales analytics pipeline: daily sales
//! forecasts, demand levels per weekday and time of day, descriptive
//! summaries and month coverage of a transaction export.

mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use output::{Format, MonthsReport, SummaryReport};
use sales_forecast::periods::{available_months, default_month, filter_by_period, MIN_DAYS_PER_MONTH};
use sales_forecast::summary::{
    repeat_customers, sales_by_category, sales_by_hour, sales_by_weekday, top_products,
    CustomerSummary, SalesSummary,
};
use sales_forecast::{AnalysisConfig, DataLoader, DemandDetector, Period, SalesForecaster, Transaction};
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "iasights")]
#[command(about = "Sales forecasting and demand analysis", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Transaction export, CSV or Parquet
    #[arg(short, long)]
    file: PathBuf,

    /// Period to analyse: YYYY-MM, last_month (ultimo_mes) or last_90_days (ultimos_90_dias)
    #[arg(short, long)]
    period: Option<String>,

    /// JSON analysis configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: Format,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Forecast daily sales
    Forecast {
        #[command(flatten)]
        common: CommonArgs,

        /// Days to forecast, overriding the configuration
        #[arg(long)]
        horizon: Option<usize>,
    },

    /// Classify demand per weekday and time bucket
    Demand {
        #[command(flatten)]
        common: CommonArgs,

        /// Bucket width in hours, overriding the configuration
        #[arg(long)]
        bucket_width: Option<u32>,
    },

    /// Descriptive sales summary
    Summary {
        #[command(flatten)]
        common: CommonArgs,

        /// Products to list, overriding the configuration
        #[arg(long)]
        top: Option<usize>,

        /// Fewest invoices for a recurring customer, overriding the configuration
        #[arg(long)]
        min_visits: Option<usize>,
    },

    /// Months present in the export
    Months {
        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Initializes tracing on stderr, RUST_LOG taking precedence over `level`
fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!(
        "iasights={level},sales_forecast={level},sales_math={level}",
        level = level
    );
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let _ = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(io::stderr)
        .try_init();
}

impl CommonArgs {
    fn load_config(&self) -> Result<AnalysisConfig> {
        match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config {}", path.display())),
            None => Ok(AnalysisConfig::default()),
        }
    }

    /// Load the export and restrict it to the requested period
    fn load_rows(&self) -> Result<Vec<Transaction>> {
        let rows = DataLoader::from_path(&self.file)
            .with_context(|| format!("Failed to load {}", self.file.display()))?;
        info!(rows = rows.len(), file = %self.file.display(), "loaded transactions");

        match &self.period {
            Some(token) => {
                let period: Period = token.parse()?;
                let rows = filter_by_period(&rows, period)
                    .with_context(|| format!("Failed to select period {}", token))?;
                debug!(%period, rows = rows.len(), "selected period");
                Ok(rows)
            }
            None => Ok(rows),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let out = stdout.lock();

    match cli.command {
        Commands::Forecast { common, horizon } => {
            let mut config = common.load_config()?.forecast;
            if let Some(horizon) = horizon {
                config.horizon_days = horizon;
            }
            let rows = common.load_rows()?;
            let outcome = SalesForecaster::new(config)?.forecast(&rows)?;
            info!(
                status = ?outcome.metrics.status,
                accuracy = ?outcome.metrics.accuracy,
                "{}",
                outcome.metrics.message
            );
            output::write_forecast(out, &outcome, common.format)
        }
        Commands::Demand {
            common,
            bucket_width,
        } => {
            let mut config = common.load_config()?.demand;
            if let Some(width) = bucket_width {
                config.bucket_width_hours = width;
            }
            let rows = common.load_rows()?;
            let demand = DemandDetector::new(config)?.detect(&rows)?;
            info!(
                cells = demand.len(),
                method = output::method_label(demand.method),
                "classified demand"
            );
            output::write_demand(out, &demand, common.format)
        }
        Commands::Summary {
            common,
            top,
            min_visits,
        } => {
            let config = common.load_config()?;
            let rows = common.load_rows()?;
            let report = SummaryReport {
                summary: SalesSummary::from_transactions(&rows),
                customers: CustomerSummary::from_transactions(&rows),
                categories: sales_by_category(&rows),
                top_products: top_products(&rows, top.unwrap_or_else(|| config.top_products())),
                by_hour: sales_by_hour(&rows),
                by_weekday: sales_by_weekday(&rows),
                repeat_customers: repeat_customers(
                    &rows,
                    min_visits.unwrap_or_else(|| config.min_visits()),
                ),
            };
            output::write_summary(out, &report, common.format)
        }
        Commands::Months { common } => {
            let rows = common.load_rows()?;
            let report = MonthsReport {
                months: available_months(&rows),
                default_month: default_month(&rows, MIN_DAYS_PER_MONTH),
            };
            output::write_months(out, &report, common.format)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    run(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forecast_command() {
        let cli = Cli::try_parse_from([
            "iasights",
            "forecast",
            "--file",
            "sales.csv",
            "--period",
            "last_month",
            "--horizon",
            "14",
            "--format",
            "csv",
        ])
        .unwrap();

        match cli.command {
            Commands::Forecast { common, horizon } => {
                assert_eq!(common.file, PathBuf::from("sales.csv"));
                assert_eq!(common.period.as_deref(), Some("last_month"));
                assert_eq!(common.format, Format::Csv);
                assert_eq!(horizon, Some(14));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_file_is_required() {
        assert!(Cli::try_parse_from(["iasights", "demand"]).is_err());
        assert!(Cli::try_parse_from(["iasights", "months", "--format", "xml", "-f", "a.csv"]).is_err());
    }

    #[test]
    fn test_global_log_level() {
        let cli =
            Cli::try_parse_from(["iasights", "summary", "-f", "a.csv", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
    }
}
