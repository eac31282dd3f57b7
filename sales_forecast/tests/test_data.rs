use chrono::{NaiveDate, NaiveTime};
use pretty_assertions::assert_eq;
use sales_forecast::data::{DataLoader, REQUIRED_COLUMNS};
use sales_forecast::ForecastError;
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str = "invoice_id,transaction_date,transaction_time,customer_id,customer_name,\
product_id,product_name,product_category,product_quantity,product_unit_price,product_subtotal";

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_data_loader_from_csv() {
    let file = csv_file(&[
        "F001,2025-11-03,09:15:00,C01,Ana,P1,Bread,Bakery,2,1.5,3.0",
        "F001,2025-11-03,09:15:00,C01,Ana,P2,Milk,Dairy,1,2.25,2.25",
        "F002,2025-11-04 00:00:00,18:40:12,,,P1,Bread,Bakery,4,1.5,6.0",
    ]);

    let rows = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(rows.len(), 3);

    let first = &rows[0];
    assert_eq!(first.invoice_id, "F001");
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 11, 3).unwrap());
    assert_eq!(first.time, NaiveTime::from_hms_opt(9, 15, 0));
    assert_eq!(first.customer_id.as_deref(), Some("C01"));
    assert_eq!(first.product_category, "Bakery");
    assert_eq!(first.quantity, 2.0);
    assert_eq!(first.subtotal, 3.0);

    let anonymous = &rows[2];
    assert_eq!(anonymous.date, NaiveDate::from_ymd_opt(2025, 11, 4).unwrap());
    assert_eq!(anonymous.customer_id, None);
    assert_eq!(anonymous.customer_name, None);
}

#[test]
fn test_invalid_numbers_and_times_are_coerced() {
    let file = csv_file(&[
        "F001,2025-11-03,noon,C01,Ana,P1,Bread,Bakery,2,1.5,abc",
        "F002,2025-11-03,10:30,C01,Ana,P1,Bread,Bakery,1,1.5,1.5",
    ]);

    let rows = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(rows[0].time, None);
    assert_eq!(rows[0].subtotal, 0.0);
    assert_eq!(rows[1].time, NaiveTime::from_hms_opt(10, 30, 0));
    assert_eq!(rows[1].subtotal, 1.5);
}

#[test]
fn test_missing_columns_are_listed() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "invoice_id,transaction_date,product_subtotal").unwrap();
    writeln!(file, "F001,2025-11-03,3.0").unwrap();

    let err = DataLoader::from_csv(file.path()).unwrap_err();
    match err {
        ForecastError::DataError(message) => {
            assert!(message.contains("transaction_time"));
            assert!(message.contains("customer_id"));
            assert!(!message.contains("invoice_id"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unparseable_date_fails() {
    let file = csv_file(&["F001,03/11/2025,09:15:00,C01,Ana,P1,Bread,Bakery,2,1.5,3.0"]);
    let err = DataLoader::from_csv(file.path()).unwrap_err();
    assert!(matches!(err, ForecastError::DataError(_)));
}

#[test]
fn test_missing_file_fails() {
    let result = DataLoader::from_csv("/nonexistent/path.csv");
    assert!(result.is_err());
}

#[test]
fn test_required_columns_are_unique() {
    let mut columns = REQUIRED_COLUMNS.to_vec();
    columns.sort();
    columns.dedup();
    assert_eq!(columns.len(), REQUIRED_COLUMNS.len());
}

#[test]
fn test_parquet_round_trip_through_from_path() {
    use polars::prelude::*;

    let csv = csv_file(&[
        "F001,2025-11-03,09:15:00,C01,Ana,P1,Bread,Bakery,2,1.5,3.0",
        "F002,2025-11-05,12:00:00,,,P2,Milk,Dairy,1,2.25,2.25",
    ]);
    let mut df = CsvReader::new(std::fs::File::open(csv.path()).unwrap())
        .infer_schema(None)
        .has_header(true)
        .finish()
        .unwrap();

    let parquet = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
    ParquetWriter::new(std::fs::File::create(parquet.path()).unwrap())
        .finish(&mut df)
        .unwrap();

    let from_parquet = DataLoader::from_path(parquet.path()).unwrap();
    let from_csv = DataLoader::from_path(csv.path()).unwrap();
    assert_eq!(from_parquet, from_csv);
}
