//! Flattening persisted reports into CSV

use std::io::Write;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tracing_subscriber::fmt::MakeWriter;

use browser_matrix::report::{EmptyResultPolicy, flatten_record, flatten_records};
use browser_matrix::{FlattenError, flatten_report, write_csv};

/// Collects formatted log output for assertions
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn scenario_report() -> Value {
    json!([
        {
            "capabilities": {"device": "iPhone 8", "browserName": "Safari"},
            "result": {"display": {"width": 100}, "text": {"lang": "en"}}
        },
        {
            "capabilities": {"device": "Galaxy S22", "browserName": "Chrome"},
            "result": {}
        }
    ])
}

#[test]
fn test_empty_result_is_logged_once_and_left_out() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();

    let records = scenario_report().as_array().cloned().unwrap();
    let flattened = tracing::subscriber::with_default(subscriber, || {
        flatten_records(&records, EmptyResultPolicy::Skip)
    })
    .unwrap();

    assert_eq!(logs.contents().matches("empty result").count(), 1);
    assert_eq!(flattened.summary.empty, 1);
    assert_eq!(flattened.rows.len(), 1);

    let row = &flattened.rows[0];
    assert_eq!(row["DisplayWidth"], json!(100));
    assert_eq!(row["TextLang"], json!("en"));

    let csv = flattened.to_csv();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines, vec!["device,browserName,DisplayWidth,TextLang", "iPhone 8,Safari,100,en"]);
    assert!(!csv.contains("Galaxy"));
}

#[test]
fn test_flat_records_pass_through_unchanged() {
    let flat = json!({"device": "iPhone 8", "DisplayWidth": 100, "TextLang": "en"});
    let Value::Object(map) = flat else { unreachable!() };
    assert_eq!(flatten_record(&map), map);
    assert_eq!(flatten_record(&flatten_record(&map)), map);
}

#[test]
fn test_report_file_to_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("selenium-report.json");
    let output = dir.path().join("csv/report.csv");
    let mut report = scenario_report();
    if let Some(records) = report.as_array_mut() {
        records.push(json!({
            "capabilities": {"browserName": "Edge", "resolution": "1920x1080"},
            "taskId": "display-metrics",
            "outcome": "timeout",
            "exception": "Timeout!"
        }));
    }
    std::fs::write(&input, serde_json::to_string_pretty(&report).unwrap()).unwrap();

    let flattened = flatten_report(&input, EmptyResultPolicy::Skip).unwrap();
    assert_eq!(flattened.summary.total, 3);
    assert_eq!(flattened.summary.invalid, 1);
    assert_eq!(flattened.summary.empty, 1);

    write_csv(&output, &flattened).unwrap();
    let csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(csv, "device,browserName,DisplayWidth,TextLang\niPhone 8,Safari,100,en");
}

#[test]
fn test_fail_policy_refuses_empty_results() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.json");
    std::fs::write(&input, scenario_report().to_string()).unwrap();

    let err = flatten_report(&input, EmptyResultPolicy::Fail).unwrap_err();
    assert!(matches!(err, FlattenError::EmptyResults { count: 1 }));
}

#[test]
fn test_report_must_be_an_array() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.json");
    std::fs::write(&input, r#"{"records": []}"#).unwrap();

    let err = flatten_report(&input, EmptyResultPolicy::Skip).unwrap_err();
    assert!(matches!(err, FlattenError::NotAnArray));
}
