//! Denormalizes a persisted report into one flat row per record.
//!
//! Each record's object-valued fields (`capabilities`, `result`) are merged
//! into one mapping. Known measurement groups are then folded into
//! prefixed columns: `{"display": {"width": 1}}` becomes
//! `{"DisplayWidth": 1}`.

use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::csv;
use crate::capability::{VENDOR_OPTIONS_KEY, capitalize};
use crate::error::{FlattenError, FlattenResult};

/// Group key and column prefix, in merge order
pub const GROUPS: [(&str, &str); 6] = [
    ("display", "Display"),
    ("glyph", "Glyph"),
    ("text", "Text"),
    ("size", "Size"),
    ("orientation", "Orientation"),
    (VENDOR_OPTIONS_KEY, "Options"),
];

/// `display.orientation` duplicates the `orientation` group
const DISPLAY_SKIPPED_KEY: &str = "orientation";

/// What to do with records whose `result` is empty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyResultPolicy {
    /// Leave them out of the table, count and log them
    #[default]
    Skip,
    /// Emit a row with whatever else the record carries
    Include,
    /// Refuse to produce a table
    Fail,
}

impl FromStr for EmptyResultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(EmptyResultPolicy::Skip),
            "include" => Ok(EmptyResultPolicy::Include),
            "fail" => Ok(EmptyResultPolicy::Fail),
            other => Err(format!(
                "invalid empty-result policy '{}': use skip, include or fail",
                other
            )),
        }
    }
}

impl fmt::Display for EmptyResultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmptyResultPolicy::Skip => "skip",
            EmptyResultPolicy::Include => "include",
            EmptyResultPolicy::Fail => "fail",
        })
    }
}

/// Classification of one persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    Valid,
    /// Not an object, empty, or no `result` key (failed work items)
    Invalid,
    /// `result` present but empty or null
    EmptyResult,
}

pub fn classify(record: &Value) -> RecordClass {
    let Value::Object(map) = record else {
        return RecordClass::Invalid;
    };
    if map.is_empty() {
        return RecordClass::Invalid;
    }
    match map.get("result") {
        None => RecordClass::Invalid,
        Some(Value::Null) => RecordClass::EmptyResult,
        Some(Value::Object(result)) if result.is_empty() => RecordClass::EmptyResult,
        Some(_) => RecordClass::Valid,
    }
}

/// Counts reported alongside the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub empty: usize,
    pub rows: usize,
}

impl fmt::Display for FlattenSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "length {}, invalid test outputs {}, valid test output with empty `result` {}, rows {}",
            self.total, self.invalid, self.empty, self.rows
        )
    }
}

/// Flattened table and its counts
#[derive(Debug, Clone)]
pub struct Flattened {
    pub rows: Vec<Map<String, Value>>,
    pub summary: FlattenSummary,
}

impl Flattened {
    pub fn to_csv(&self) -> String {
        csv::format_rows(&self.rows)
    }
}

/// Merge a record's nested fields and fold measurement groups into
/// prefixed columns.
///
/// A record with no object-valued fields comes back unchanged.
pub fn flatten_record(record: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = Map::new();
    for (key, value) in record {
        match value {
            Value::Object(inner) => {
                for (k, v) in inner {
                    merged.insert(k.clone(), v.clone());
                }
            }
            other => {
                merged.insert(key.clone(), other.clone());
            }
        }
    }

    let mut row = Map::new();
    for (key, value) in &merged {
        if is_group(key) && value.is_object() {
            continue;
        }
        row.insert(key.clone(), value.clone());
    }
    for (group, prefix) in GROUPS {
        let Some(Value::Object(fields)) = merged.get(group) else {
            continue;
        };
        for (key, value) in fields {
            if group == "display" && key == DISPLAY_SKIPPED_KEY {
                continue;
            }
            row.insert(format!("{}{}", prefix, capitalize(key)), value.clone());
        }
    }
    row
}

fn is_group(key: &str) -> bool {
    GROUPS.iter().any(|(group, _)| *group == key)
}

/// Classify and flatten every record of a report
pub fn flatten_records(records: &[Value], policy: EmptyResultPolicy) -> FlattenResult<Flattened> {
    let mut summary = FlattenSummary {
        total: records.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match classify(record) {
            RecordClass::Invalid => {
                summary.invalid += 1;
                tracing::debug!(index, "record has no result, skipped");
            }
            RecordClass::EmptyResult => {
                summary.empty += 1;
                tracing::warn!(index, task = %task_label(record), "empty result");
                if policy == EmptyResultPolicy::Include {
                    if let Value::Object(map) = record {
                        rows.push(flatten_record(map));
                    }
                }
            }
            RecordClass::Valid => {
                summary.valid += 1;
                if let Value::Object(map) = record {
                    rows.push(flatten_record(map));
                }
            }
        }
    }

    if policy == EmptyResultPolicy::Fail && summary.empty > 0 {
        return Err(FlattenError::EmptyResults {
            count: summary.empty,
        });
    }

    summary.rows = rows.len();
    tracing::info!(
        length = summary.total,
        invalid = summary.invalid,
        empty = summary.empty,
        rows = summary.rows,
        "report flattened"
    );
    Ok(Flattened { rows, summary })
}

/// Read a persisted report and flatten it
pub fn flatten_report(path: &Path, policy: EmptyResultPolicy) -> FlattenResult<Flattened> {
    let raw = std::fs::read_to_string(path).map_err(|source| FlattenError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(records) = serde_json::from_str::<Value>(&raw)? else {
        return Err(FlattenError::NotAnArray);
    };
    flatten_records(&records, policy)
}

/// Write the CSV next to wherever the caller wants it
pub fn write_csv(path: &Path, flattened: &Flattened) -> FlattenResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, flattened.to_csv())?;
    Ok(())
}

fn task_label(record: &Value) -> String {
    record
        .get("taskId")
        .and_then(Value::as_str)
        .unwrap_or("-")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&json!({"result": {"a": 1}})), RecordClass::Valid);
        assert_eq!(classify(&json!({"result": true})), RecordClass::Valid);
        assert_eq!(classify(&json!({"result": {}})), RecordClass::EmptyResult);
        assert_eq!(classify(&json!({"result": null})), RecordClass::EmptyResult);
        assert_eq!(classify(&json!({"exception": "x"})), RecordClass::Invalid);
        assert_eq!(classify(&json!({})), RecordClass::Invalid);
        assert_eq!(classify(&json!("nope")), RecordClass::Invalid);
    }

    #[test]
    fn test_flatten_prefixes_groups() {
        let row = flatten_record(&map(json!({
            "capabilities": {
                "device": "iPhone 8",
                "browserName": "Safari",
                "bstack:options": {"os": "ios", "local": true}
            },
            "result": {
                "display": {"width": 100, "orientation": "portrait-primary"},
                "orientation": {"angle": 0},
                "size": {"innerWidth": 375}
            }
        })));
        assert_eq!(
            row,
            map(json!({
                "device": "iPhone 8",
                "browserName": "Safari",
                "DisplayWidth": 100,
                "SizeInnerWidth": 375,
                "OrientationAngle": 0,
                "OptionsOs": "ios",
                "OptionsLocal": true
            }))
        );
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys[2], "DisplayWidth");
    }

    #[test]
    fn test_flatten_is_identity_on_flat_records() {
        let flat = map(json!({"DisplayWidth": 100, "TextLang": "en", "taskId": "t"}));
        assert_eq!(flatten_record(&flat), flat);
    }

    #[test]
    fn test_non_object_result_becomes_column() {
        let row = flatten_record(&map(json!({"taskId": "t", "result": true})));
        assert_eq!(row, map(json!({"taskId": "t", "result": true})));
    }

    #[test]
    fn test_policies() {
        let records = vec![
            json!({"capabilities": {"browserName": "Chrome"}, "result": {"text": {"lang": "en"}}}),
            json!({"capabilities": {"browserName": "Firefox"}, "result": {}}),
            json!({"capabilities": {"browserName": "Edge"}, "exception": "Timeout!"}),
        ];

        let skipped = flatten_records(&records, EmptyResultPolicy::Skip).unwrap();
        assert_eq!(
            skipped.summary,
            FlattenSummary { total: 3, valid: 1, invalid: 1, empty: 1, rows: 1 }
        );

        let included = flatten_records(&records, EmptyResultPolicy::Include).unwrap();
        assert_eq!(included.summary.rows, 2);
        assert_eq!(included.to_csv(), "browserName,TextLang\nChrome,en\nFirefox,");

        let err = flatten_records(&records, EmptyResultPolicy::Fail).unwrap_err();
        assert!(matches!(err, FlattenError::EmptyResults { count: 1 }));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Include".parse::<EmptyResultPolicy>(), Ok(EmptyResultPolicy::Include));
        assert!("maybe".parse::<EmptyResultPolicy>().is_err());
    }
}
