//! Delimited text output for flattened rows.

use serde_json::{Map, Value};

/// Render rows as CSV.
///
/// The header is the union of row keys in first-seen order. Missing
/// fields become empty cells. Fields containing the delimiter, a quote or
/// a line break are quoted with inner quotes doubled.
pub fn format_rows(rows: &[Map<String, Value>]) -> String {
    let columns = columns(rows);
    let mut out = String::new();
    push_line(&mut out, columns.iter().map(|c| escape(c)));
    for row in rows {
        push_line(
            &mut out,
            columns
                .iter()
                .map(|c| escape(&cell(row.get(c.as_str())))),
        );
    }
    out
}

/// Union of keys across rows, first-seen order
pub fn columns(rows: &[Map<String, Value>]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn push_line(out: &mut String, fields: impl Iterator<Item = String>) {
    let line: Vec<String> = fields.collect();
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&line.join(","));
}

/// Text for one cell: strings raw, null and missing empty, anything else
/// as compact JSON
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
