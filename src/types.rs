//! Core types for mobility summaries
//!
//! This module defines the records read from a session folder and the derived
//! structures that flow from the session parser into the cohort aggregator.

use crate::error::{Result, SummaryError};
use chrono::{DateTime, FixedOffset};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One row of `wb.csv`: a detected contiguous walking episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkingBoutRecord {
    /// First sample index of the bout
    pub start: i64,
    /// Last sample index of the bout
    pub end: i64,
    /// Bout duration (seconds)
    #[serde(default, deserialize_with = "nullable_f64")]
    pub duration_s: Option<f64>,
    /// Steps per minute
    #[serde(default, deserialize_with = "nullable_f64")]
    pub cadence_spm: Option<f64>,
    /// Average stride length (meters)
    #[serde(default, deserialize_with = "nullable_f64")]
    pub stride_length_m: Option<f64>,
    /// Average walking speed (meters per second)
    #[serde(default, deserialize_with = "nullable_f64")]
    pub walking_speed_mps: Option<f64>,
    /// Number of strides detected in the bout
    #[serde(default, deserialize_with = "nullable_count")]
    pub n_strides: Option<u32>,
}

/// A walking bout placed on the wall clock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkingBout {
    #[serde(flatten)]
    pub record: WalkingBoutRecord,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    /// Hour of day (0-23) of `start_time`
    pub bout_hour: u8,
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Calendar-date label of the recording day
    pub session_day: String,
    /// Recording origin (epoch milliseconds)
    pub session_timestamp: i64,
    /// Any further keys, preserved for the report layer
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Opaque CSV table passed through without interpretation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a headed CSV file verbatim
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| csv_error(path, e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stack tables vertically, aligning columns by header name.
    ///
    /// The result carries the union of headers in first-seen order; cells for
    /// columns a table lacks are left empty. Returns `None` for no input.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Option<Table> {
        let tables: Vec<&Table> = tables.into_iter().collect();
        if tables.is_empty() {
            return None;
        }

        let mut headers: Vec<String> = Vec::new();
        for table in &tables {
            for header in &table.headers {
                if !headers.contains(header) {
                    headers.push(header.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.len()).sum());
        for table in &tables {
            let positions: Vec<Option<usize>> = headers
                .iter()
                .map(|h| table.headers.iter().position(|own| own == h))
                .collect();
            for row in &table.rows {
                rows.push(
                    positions
                        .iter()
                        .map(|pos| pos.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                        .collect(),
                );
            }
        }

        Some(Table { headers, rows })
    }
}

/// Map a csv failure on `path` into a `DataFormat` error. Missing-file errors
/// are reported as I/O so callers can tell the two apart.
pub(crate) fn csv_error(path: &Path, err: csv::Error) -> SummaryError {
    match err.kind() {
        csv::ErrorKind::Io(source) => {
            SummaryError::io(path, std::io::Error::new(source.kind(), source.to_string()))
        }
        _ => SummaryError::data_format(path, err),
    }
}

/// Empty cells and NaN both mean "no value"
fn nullable_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => {
            let value: f64 = text
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid number: {:?}", text)))?;
            Ok(if value.is_nan() { None } else { Some(value) })
        }
    }
}

/// Counts may be written as floats (`12.0`) when the column holds NaN
fn nullable_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match nullable_f64(deserializer)? {
        None => Ok(None),
        Some(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
            Ok(Some(value as u32))
        }
        Some(value) => Err(de::Error::custom(format!("invalid count: {}", value))),
    }
}
