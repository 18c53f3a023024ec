//! Aggregation settings
//!
//! Everything that changes how folders are parsed or how failures are handled
//! lives here so the CLI and library callers share one struct.

use crate::error::{Result, SummaryError};
use crate::time::ClockZone;
use crate::DEFAULT_SAMPLE_RATE_HZ;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the cohort build does when a folder holds a malformed artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderErrorPolicy {
    /// Propagate the first `DataFormat` error and build nothing
    #[default]
    Abort,
    /// Exclude the folder and record it in `CohortResult::skipped`
    Skip,
}

/// Settings shared by the session parser and the cohort aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Sensor sample rate used to turn sample indices into seconds
    pub sample_rate_hz: f64,
    /// Clock used for hour-of-day bucketing; `None` is the host's local clock
    pub utc_offset_seconds: Option<i32>,
    pub on_malformed_folder: FolderErrorPolicy,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            utc_offset_seconds: None,
            on_malformed_folder: FolderErrorPolicy::Abort,
        }
    }
}

impl AggregatorConfig {
    /// Load settings from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SummaryError::io(path, e))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| SummaryError::data_format(path, e))?;
        config.validate().map_err(|e| match e {
            SummaryError::InvalidConfig(message) => SummaryError::data_format(path, message),
            other => other,
        })?;
        Ok(config)
    }

    /// Resolve the configured clock.
    ///
    /// An offset outside +/-24h is an `InvalidConfig` error rather than a
    /// silent fallback to the local clock.
    pub fn clock(&self) -> Result<ClockZone> {
        match self.utc_offset_seconds {
            None => Ok(ClockZone::Local),
            Some(secs) => FixedOffset::east_opt(secs)
                .map(ClockZone::Fixed)
                .ok_or_else(|| {
                    SummaryError::InvalidConfig(format!(
                        "utc_offset_seconds out of range: {}",
                        secs
                    ))
                }),
        }
    }

    /// Check the sample rate and clock offset
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(SummaryError::InvalidConfig(format!(
                "sample_rate_hz must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        self.clock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.sample_rate_hz, 100.0);
        assert_eq!(config.on_malformed_folder, FolderErrorPolicy::Abort);
        assert_eq!(config.clock().unwrap(), ClockZone::Local);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"utc_offset_seconds": 3600, "on_malformed_folder": "skip"}}"#).unwrap();

        let config = AggregatorConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.sample_rate_hz, 100.0);
        assert_eq!(config.on_malformed_folder, FolderErrorPolicy::Skip);
        assert_eq!(
            config.clock().unwrap(),
            ClockZone::Fixed(FixedOffset::east_opt(3600).unwrap())
        );
    }

    #[test]
    fn test_rejects_non_positive_sample_rate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sample_rate_hz": 0.0}}"#).unwrap();

        let err = AggregatorConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, SummaryError::DataFormat { .. }));
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        let config = AggregatorConfig {
            utc_offset_seconds: Some(86_400),
            ..Default::default()
        };
        assert!(matches!(config.clock(), Err(SummaryError::InvalidConfig(_))));
        assert!(matches!(config.validate(), Err(SummaryError::InvalidConfig(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"utc_offset_seconds": -90000}}"#).unwrap();
        let err = AggregatorConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, SummaryError::DataFormat { .. }));
    }
}
