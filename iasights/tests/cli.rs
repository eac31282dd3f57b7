use pretty_assertions::assert_eq;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn sample_export() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "invoice_id,transaction_date,transaction_time,customer_id,customer_name,product_id,\
product_name,product_category,product_quantity,product_unit_price,product_subtotal"
    )
    .unwrap();
    for day in 1..=28 {
        writeln!(
            file,
            "F{day},2025-02-{day:02},1{h}:00:00,C1,Eva,P1,Tea,Drinks,1,{v},{v}",
            h = day % 10,
            v = 10 + day % 7
        )
        .unwrap();
    }
    file
}

fn iasights(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_iasights"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_months_command() {
    let export = sample_export();
    let path = export.path().to_str().unwrap();
    let output = iasights(&["months", "--file", path]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["default_month"], "2025-02");
    assert_eq!(value["months"][0]["distinct_days"], 28);
}

#[test]
fn test_forecast_command_csv() {
    let export = sample_export();
    let path = export.path().to_str().unwrap();
    let output = iasights(&["forecast", "-f", path, "--horizon", "3", "--format", "csv"]);

    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    let future: Vec<&str> = text.lines().filter(|l| l.contains(",future,")).collect();
    assert_eq!(future.len(), 3);
    assert!(future[0].starts_with("2025-03-01,"));
}

#[test]
fn test_bad_period_fails() {
    let export = sample_export();
    let path = export.path().to_str().unwrap();
    let output = iasights(&["demand", "-f", path, "--period", "someday"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Invalid period"));
}
