//! Record serialization: writes a fetched record sequence to a local file.
//!
//! Owns the set of supported output formats and the per-record transforms
//! (fetch-timestamp column, date/datetime coercion). The task hands this
//! module a path and a record slice and treats everything else as opaque.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::OutputFormat;
use crate::contract::Record;

/// Name of the column appended when `record_time_added` is set.
pub const FETCH_TIME_FIELD: &str = "time_fetched_from_salesforce";

/// CRM result metadata key, excluded from every output format.
const ATTRIBUTES_FIELD: &str = "attributes";

#[derive(Debug)]
pub enum WriteError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Io(e) => write!(f, "I/O error writing records: {e}"),
            WriteError::Csv(e) => write!(f, "CSV error writing records: {e}"),
            WriteError::Json(e) => write!(f, "JSON error writing records: {e}"),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Io(e) => Some(e),
            WriteError::Csv(e) => Some(e),
            WriteError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for WriteError {
    fn from(e: std::io::Error) -> Self {
        WriteError::Io(e)
    }
}

impl From<csv::Error> for WriteError {
    fn from(e: csv::Error) -> Self {
        WriteError::Csv(e)
    }
}

impl From<serde_json::Error> for WriteError {
    fn from(e: serde_json::Error) -> Self {
        WriteError::Json(e)
    }
}

/// Serialize `records` to the file at `path` in the given format.
///
/// The file is created (or truncated), fully written, flushed and synced
/// before return. Returns the number of data records written.
pub fn write_records(
    records: &[Record],
    path: &Path,
    format: OutputFormat,
    coerce_to_timestamp: bool,
    record_time_added: bool,
) -> Result<usize, WriteError> {
    let fetched_at = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;

    let mut prepared: Vec<Record> = Vec::with_capacity(records.len());
    for record in records {
        let mut out = Record::new();
        for (key, value) in record {
            if key == ATTRIBUTES_FIELD {
                continue;
            }
            let value = if coerce_to_timestamp {
                coerce_value(value)
            } else {
                value.clone()
            };
            out.insert(key.clone(), value);
        }
        if record_time_added {
            out.insert(FETCH_TIME_FIELD.to_string(), json_number(fetched_at));
        }
        prepared.push(out);
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = match format {
        OutputFormat::Csv => write_csv(&prepared, &mut writer)?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, &prepared)?;
            prepared.len()
        }
        OutputFormat::Ndjson => {
            for record in &prepared {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            prepared.len()
        }
    };
    writer.flush()?;
    writer.get_ref().sync_all()?;

    info!(
        path = %path.display(),
        records = written,
        format = ?format,
        "Wrote records to local file"
    );
    Ok(written)
}

fn write_csv<W: Write>(records: &[Record], writer: W) -> Result<usize, WriteError> {
    // Header is the union of record keys in first-seen order.
    let mut header: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.clone());
            }
        }
    }
    if header.is_empty() {
        debug!("No records and no fields, writing empty CSV output");
        return Ok(0);
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&header)?;
    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|field| record.get(field).map(cell_value).unwrap_or_default())
            .collect();
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(records.len())
}

/// Render one value as a CSV cell. Strings go through bare (the writer owns
/// quoting); nested structures are embedded as compact JSON.
fn cell_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_value(value: &Value) -> Value {
    if let Value::String(s) = value {
        if let Some(epoch) = parse_timestamp(s) {
            return json_number(epoch);
        }
    }
    value.clone()
}

/// Parse a date/datetime string to fractional epoch seconds (UTC).
///
/// Accepts RFC 3339, the CRM's `%Y-%m-%dT%H:%M:%S%.f%z` rendering (offset
/// without colon), and bare `%Y-%m-%d` dates (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis() as f64 / 1000.0);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.timestamp_millis() as f64 / 1000.0);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(midnight.and_utc().timestamp() as f64);
    }
    None
}

fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
