//! Structured data flattening (JSON, CSV/TSV)
//!
//! Structure becomes annotated text rather than being discarded: every key,
//! column name and value survives in the output.
//!
//! - **JSON**: objects as `key: value` joined by `"; "`, arrays as elements
//!   joined by `"; "`, depth-first, keys in document order
//! - **CSV/TSV**: each row as `col=value` joined by `" | "`, rows by `"\n"`

use serde_json::Value;

use crate::error::Result;

const JSON_SEPARATOR: &str = "; ";
const CSV_FIELD_SEPARATOR: &str = " | ";

/// Parse and flatten a JSON document.
pub fn flatten_json(bytes: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(bytes)?;
    Ok(flatten_value(&value))
}

/// Depth-first linearization of a JSON value.
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{}: {}", key, flatten_value(value)))
            .collect::<Vec<_>>()
            .join(JSON_SEPARATOR),
        Value::Array(items) => items
            .iter()
            .map(flatten_value)
            .collect::<Vec<_>>()
            .join(JSON_SEPARATOR),
        Value::String(s) => s.clone(),
        // Numbers, booleans and null in their JSON form
        scalar => scalar.to_string(),
    }
}

/// Parse and flatten delimited records with a header row.
///
/// Missing or blank header cells are named `column_N` (1-based). Rows may be
/// shorter or longer than the header; cells are read as lossy UTF-8.
pub fn flatten_csv(bytes: &[u8], delimiter: u8) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let fields: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                format!(
                    "{}={}",
                    column_name(&headers, idx),
                    String::from_utf8_lossy(cell)
                )
            })
            .collect();
        rows.push(fields.join(CSV_FIELD_SEPARATOR));
    }

    Ok(rows.join("\n"))
}

fn column_name(headers: &[String], idx: usize) -> String {
    match headers.get(idx) {
        Some(name) if !name.is_empty() => name.clone(),
        _ => format!("column_{}", idx + 1),
    }
}
