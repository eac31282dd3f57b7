use chrono::{Duration, NaiveDate};
use sales_forecast::periods::{filter_by_period, Period};
use sales_forecast::summary::{repeat_customers, sales_by_category, SalesSummary};
use sales_forecast::{
    AnalysisConfig, DataLoader, DemandDetector, ForecastStatus, SalesForecaster,
};
use std::io::Write;
use tempfile::NamedTempFile;

// Two invoices a day for 35 days, with a weekday pattern and one regular customer
fn create_sample_data() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "invoice_id,transaction_date,transaction_time,customer_id,customer_name,product_id,\
product_name,product_category,product_quantity,product_unit_price,product_subtotal"
    )
    .unwrap();

    let first = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
    for i in 0..35 {
        let date = first + Duration::days(i);
        let weekend_boost = if i % 7 >= 5 { 3.0 } else { 1.0 };
        writeln!(
            file,
            "M{i},{date},09:20:00,C7,Rosa,P1,Coffee,Drinks,2,2.5,{}",
            5.0 * weekend_boost
        )
        .unwrap();
        writeln!(
            file,
            "E{i},{date},19:05:00,,,P2,Sandwich,Food,1,{p},{p}",
            p = 12.0 * weekend_boost
        )
        .unwrap();
    }
    file
}

#[test]
fn test_full_analysis_workflow() {
    let data_file = create_sample_data();
    let rows = DataLoader::from_csv(data_file.path()).unwrap();
    assert_eq!(rows.len(), 70);

    let config = AnalysisConfig::from_json_str(
        r#"{"forecast": {"horizon_days": 5, "n_estimators": 30}, "demand": {"bucket_width_hours": 4}}"#,
    )
    .unwrap();

    // Forecast over the whole history
    let forecaster = SalesForecaster::new(config.forecast.clone()).unwrap();
    let outcome = forecaster.forecast(&rows).unwrap();
    assert_eq!(outcome.metrics.status, ForecastStatus::Trained);
    assert_eq!(outcome.metrics.n_days, 35);
    assert_eq!(outcome.future.len(), 5);
    assert_eq!(
        outcome.future[0].date,
        NaiveDate::from_ymd_opt(2025, 11, 5).unwrap()
    );

    // Demand over the same rows: two buckets per weekday
    let detector = DemandDetector::new(config.demand.clone()).unwrap();
    let demand = detector.detect(&rows).unwrap();
    assert_eq!(demand.len(), 14);
    assert_eq!(demand.cells[0].bucket.label(), "08:00-12:00");
    assert_eq!(demand.cells[1].bucket.label(), "16:00-20:00");
    assert_eq!(demand.to_dataframe().unwrap().height(), 14);

    // October alone still trains: 31 days
    let october = filter_by_period(&rows, "2025-10".parse::<Period>().unwrap()).unwrap();
    let outcome = forecaster.forecast(&october).unwrap();
    assert!(outcome.is_trained());

    // November has only 4 days
    let november = filter_by_period(&rows, "2025-11".parse::<Period>().unwrap()).unwrap();
    let outcome = forecaster.forecast(&november).unwrap();
    assert_eq!(outcome.metrics.accuracy, None);
    assert!(outcome.future.is_empty());

    // Summaries
    let summary = SalesSummary::from_transactions(&rows);
    assert_eq!(summary.distinct_invoices, 70);
    assert_eq!(summary.known_customer_rows, 35);

    let categories = sales_by_category(&rows);
    assert_eq!(categories[0].category, "Food");

    let regulars = repeat_customers(&rows, 2);
    assert_eq!(regulars.len(), 1);
    assert_eq!(regulars[0].customer_name, "Rosa");
    assert_eq!(regulars[0].invoices, 35);
}
