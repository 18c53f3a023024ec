//! Session folder parsing
//!
//! A session folder holds up to four artifacts: `wb.csv` (walking bouts),
//! `aggregated.csv`, `stride.csv`, and `metadata.json`. Each is optional. The
//! parser loads whatever is present, places bouts on the wall clock, and
//! derives the per-session statistics.

use crate::config::AggregatorConfig;
use crate::error::{Result, SummaryError};
use crate::hourly::{HourlyReducer, HourlySpeed};
use crate::render::LabeledTable;
use crate::time::{ClockZone, TimeReconstructor};
use crate::types::{csv_error, SessionMetadata, Table, WalkingBout, WalkingBoutRecord};
use crate::DEFAULT_SAMPLE_RATE_HZ;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const WALKING_BOUTS_FILE: &str = "wb.csv";
pub const AGGREGATED_FILE: &str = "aggregated.csv";
pub const STRIDES_FILE: &str = "stride.csv";
pub const METADATA_FILE: &str = "metadata.json";

/// Everything derived from one session folder
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub folder: PathBuf,
    /// `None` when the folder has no `wb.csv`
    pub bouts: Option<Vec<WalkingBout>>,
    pub aggregated: Option<Table>,
    pub strides: Option<Table>,
    /// Empty when the folder has no `metadata.json`
    pub metadata: SessionMetadata,
    /// Sum of bout durations (seconds)
    pub total_walking_time: f64,
    pub mean_bout_duration: f64,
    pub max_bout_duration: f64,
    pub hourly_speed: HourlySpeed,
    /// Session origin (epoch milliseconds), 0 without metadata
    pub start_timestamp: i64,
    /// Day label, empty without metadata
    pub day: String,
}

impl SessionResult {
    pub fn bout_count(&self) -> usize {
        self.bouts.as_ref().map_or(0, Vec::len)
    }

    /// Stride totals per hour, for the daily activity chart
    pub fn hourly_strides_table(&self) -> LabeledTable {
        let mut table = LabeledTable::new("Strides");
        for (hour, bucket) in self.hourly_speed.iter() {
            table.push(hour.to_string(), bucket.stride_total as f64);
        }
        table
    }
}

/// Per-session bout duration statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DurationStats {
    total: f64,
    mean: f64,
    max: f64,
}

impl DurationStats {
    fn from_bouts(bouts: Option<&[WalkingBout]>) -> Self {
        let durations: Vec<f64> = bouts
            .unwrap_or_default()
            .iter()
            .filter_map(|b| b.record.duration_s)
            .collect();

        if durations.is_empty() {
            return Self::default();
        }

        let total: f64 = durations.iter().sum();
        Self {
            total,
            mean: total / durations.len() as f64,
            max: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Loads and derives a `SessionResult` from one folder
#[derive(Debug, Clone, Copy)]
pub struct SessionParser {
    sample_rate_hz: f64,
    clock: ClockZone,
}

impl Default for SessionParser {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE_HZ, ClockZone::Local)
    }
}

impl SessionParser {
    pub fn new(sample_rate_hz: f64, clock: ClockZone) -> Self {
        Self {
            sample_rate_hz,
            clock,
        }
    }

    pub fn from_config(config: &AggregatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.sample_rate_hz, config.clock()?))
    }

    /// Parse one session folder.
    ///
    /// Missing artifacts leave their field empty. A present artifact that
    /// cannot be parsed fails with `DataFormat` naming the file.
    pub fn parse(&self, folder: &Path) -> Result<SessionResult> {
        let raw_bouts = optional(load_bout_records(&folder.join(WALKING_BOUTS_FILE)))?;
        let aggregated = optional(load_table(&folder.join(AGGREGATED_FILE)))?;
        let strides = optional(load_table(&folder.join(STRIDES_FILE)))?;
        let metadata = optional(load_metadata(&folder.join(METADATA_FILE)))?.unwrap_or_default();

        let start_timestamp = metadata.session_timestamp;
        let day = metadata.session_day.clone();

        let bouts = match raw_bouts {
            Some(records) => Some(self.place_on_clock(
                records,
                start_timestamp,
                &folder.join(WALKING_BOUTS_FILE),
            )?),
            None => None,
        };

        let hourly_speed = HourlyReducer::reduce(bouts.as_deref().unwrap_or_default());
        let stats = DurationStats::from_bouts(bouts.as_deref());

        debug!(
            folder = %folder.display(),
            bouts = bouts.as_ref().map(Vec::len),
            day = %day,
            "parsed session folder"
        );

        Ok(SessionResult {
            folder: folder.to_path_buf(),
            bouts,
            aggregated,
            strides,
            metadata,
            total_walking_time: stats.total,
            mean_bout_duration: stats.mean,
            max_bout_duration: stats.max,
            hourly_speed,
            start_timestamp,
            day,
        })
    }

    fn place_on_clock(
        &self,
        records: Vec<WalkingBoutRecord>,
        origin_ms: i64,
        source: &Path,
    ) -> Result<Vec<WalkingBout>> {
        let recon = TimeReconstructor::new(origin_ms, self.sample_rate_hz, self.clock);

        records
            .into_iter()
            .map(|record| {
                let start_time = recon
                    .timestamp(record.start)
                    .ok_or_else(|| out_of_range(source, record.start))?;
                let end_time = recon
                    .timestamp(record.end)
                    .ok_or_else(|| out_of_range(source, record.end))?;
                Ok(WalkingBout {
                    bout_hour: TimeReconstructor::hour_of_day(&start_time),
                    record,
                    start_time,
                    end_time,
                })
            })
            .collect()
    }
}

fn out_of_range(source: &Path, sample_index: i64) -> SummaryError {
    SummaryError::data_format(
        source,
        format!("sample index {} is outside the representable time range", sample_index),
    )
}

/// Treat an absent or unreadable optional artifact as missing
fn optional<T>(loaded: Result<Option<T>>) -> Result<Option<T>> {
    match loaded {
        Err(SummaryError::Io { path, source }) => {
            warn!(path = %path.display(), error = %source, "artifact unreadable, treating as absent");
            Ok(None)
        }
        other => other,
    }
}

fn load_bout_records(path: &Path) -> Result<Option<Vec<WalkingBoutRecord>>> {
    if !path.is_file() {
        return Ok(None);
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let records = reader
        .deserialize::<WalkingBoutRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| csv_error(path, e))?;

    Ok(Some(records))
}

fn load_table(path: &Path) -> Result<Option<Table>> {
    if !path.is_file() {
        return Ok(None);
    }
    Table::from_csv_path(path).map(Some)
}

fn load_metadata(path: &Path) -> Result<Option<SessionMetadata>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| SummaryError::io(path, e))?;
    let metadata = serde_json::from_str(&content).map_err(|e| SummaryError::data_format(path, e))?;
    Ok(Some(metadata))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::FixedOffset;
    use std::fs;

    pub(crate) const WB_HEADER: &str =
        "start,end,duration_s,cadence_spm,stride_length_m,walking_speed_mps,n_strides\n";

    pub(crate) fn utc_parser() -> SessionParser {
        SessionParser::new(100.0, ClockZone::Fixed(FixedOffset::east_opt(0).unwrap()))
    }

    pub(crate) fn write_session(dir: &Path, day: &str, timestamp_ms: i64, wb_rows: Option<&str>) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(METADATA_FILE),
            format!(
                r#"{{"session_day": "{}", "session_timestamp": {}}}"#,
                day, timestamp_ms
            ),
        )
        .unwrap();
        if let Some(rows) = wb_rows {
            fs::write(dir.join(WALKING_BOUTS_FILE), format!("{}{}", WB_HEADER, rows)).unwrap();
        }
    }

    #[test]
    fn test_empty_folder_degrades_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let session = utc_parser().parse(dir.path()).unwrap();

        assert!(session.bouts.is_none());
        assert!(session.strides.is_none());
        assert!(session.aggregated.is_none());
        assert_eq!(session.total_walking_time, 0.0);
        assert_eq!(session.mean_bout_duration, 0.0);
        assert_eq!(session.max_bout_duration, 0.0);
        assert_eq!(session.start_timestamp, 0);
        assert_eq!(session.day, "");
        assert_eq!(session.metadata, SessionMetadata::default());
        assert_eq!(session.hourly_speed.iter().count(), 24);
        assert!(session.hourly_speed.iter().all(|(_, b)| b.mean_speed == 0.0));
    }

    #[test]
    fn test_parses_bouts_and_statistics() {
        let dir = tempfile::tempdir().unwrap();
        // 2023-11-14T22:13:20Z
        write_session(
            dir.path(),
            "2023-11-14",
            1_700_000_000_000,
            Some(
                "0,1000,10.0,100.0,1.2,1.0,8\n\
                 360000,362000,20.0,110.0,1.3,1.4,16\n\
                 400000,400600,6.0,,,,\n",
            ),
        );

        let session = utc_parser().parse(dir.path()).unwrap();

        assert_eq!(session.day, "2023-11-14");
        assert_eq!(session.start_timestamp, 1_700_000_000_000);
        assert_eq!(session.bout_count(), 3);
        assert_eq!(session.total_walking_time, 36.0);
        assert_eq!(session.mean_bout_duration, 12.0);
        assert_eq!(session.max_bout_duration, 20.0);

        let bouts = session.bouts.as_ref().unwrap();
        assert_eq!(bouts[0].start_time.timestamp(), 1_700_000_000);
        assert_eq!(bouts[0].end_time.timestamp(), 1_700_000_010);
        assert_eq!(bouts[0].bout_hour, 22);
        // +3600 s crosses into the next hour
        assert_eq!(bouts[1].bout_hour, 23);

        assert_eq!(session.hourly_speed.hour(22).stride_total, 8);
        assert_eq!(session.hourly_speed.hour(22).mean_speed, 1.0);
        assert_eq!(session.hourly_speed.hour(23).stride_total, 16);
        assert_eq!(session.hourly_speed.hour(23).speed_count, 1);
    }

    #[test]
    fn test_header_only_bout_table() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "2024-01-01", 0, Some(""));

        let session = utc_parser().parse(dir.path()).unwrap();
        assert_eq!(session.bouts.as_ref().map(Vec::len), Some(0));
        assert_eq!(session.max_bout_duration, 0.0);
        assert_eq!(session.mean_bout_duration, 0.0);
    }

    #[test]
    fn test_bouts_without_metadata_use_epoch_origin() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(WALKING_BOUTS_FILE),
            format!("{}{}", WB_HEADER, "0,100,1.0,90,1.0,1.0,2\n"),
        )
        .unwrap();

        let session = utc_parser().parse(dir.path()).unwrap();
        let bouts = session.bouts.unwrap();
        assert_eq!(bouts[0].start_time.timestamp(), 0);
        assert_eq!(bouts[0].bout_hour, 0);
    }

    #[test]
    fn test_passes_through_opaque_tables() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STRIDES_FILE), "s_id,length\n1,1.1\n2,1.2\n").unwrap();
        fs::write(dir.path().join(AGGREGATED_FILE), "k,v\nsteps,100\n").unwrap();

        let session = utc_parser().parse(dir.path()).unwrap();
        assert_eq!(session.strides.as_ref().unwrap().len(), 2);
        assert_eq!(session.aggregated.as_ref().unwrap().headers, vec!["k", "v"]);
        assert!(session.bouts.is_none());
    }

    #[test]
    fn test_malformed_metadata_names_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(METADATA_FILE), "{not json").unwrap();

        let err = utc_parser().parse(dir.path()).unwrap_err();
        match err {
            SummaryError::DataFormat { file, .. } => {
                assert_eq!(file.file_name().unwrap(), METADATA_FILE)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_bouts_names_file() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "d", 0, Some("0,abc,1.0,90,1.0,1.0,2\n"));

        let err = utc_parser().parse(dir.path()).unwrap_err();
        match err {
            SummaryError::DataFormat { file, .. } => {
                assert_eq!(file.file_name().unwrap(), WALKING_BOUTS_FILE)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_hourly_strides_table() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "d", 0, Some("0,100,1.0,90,1.0,1.0,7\n"));

        let table = utc_parser().parse(dir.path()).unwrap().hourly_strides_table();
        assert_eq!(table.len(), 24);
        assert_eq!(table.rows()[0], ("0".to_string(), 7.0));
        assert_eq!(table.rows()[23], ("23".to_string(), 0.0));
    }
}
