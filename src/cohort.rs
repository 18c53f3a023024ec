//! Cohort aggregation
//!
//! Combines every session folder under a root into population statistics and
//! provides chronological queries over the sessions.

use crate::config::{AggregatorConfig, FolderErrorPolicy};
use crate::error::{Result, SummaryError};
use crate::render::LabeledTable;
use crate::scanner::{DirectoryScanner, ScanFailure};
use crate::session::{SessionParser, SessionResult};
use crate::types::{Table, WalkingBout};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A folder excluded under `FolderErrorPolicy::Skip`
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFolder {
    pub folder: PathBuf,
    pub reason: String,
}

/// Parsed sessions of one scan, before aggregation
#[derive(Debug, Clone)]
pub struct SessionBatch {
    pub sessions: Vec<SessionResult>,
    pub skipped: Vec<SkippedFolder>,
    pub scan_failures: Vec<ScanFailure>,
}

/// Per-session value plotted against the day label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyMetric {
    TotalWalkingTime,
    MeanBoutDuration,
    MaxBoutDuration,
    BoutCount,
}

impl DailyMetric {
    pub fn label(&self) -> &'static str {
        match self {
            DailyMetric::TotalWalkingTime => "Walking Time (s)",
            DailyMetric::MeanBoutDuration => "Mean Bout Duration (s)",
            DailyMetric::MaxBoutDuration => "Longest Bout (s)",
            DailyMetric::BoutCount => "Walking Bouts",
        }
    }

    fn value(&self, session: &SessionResult) -> f64 {
        match self {
            DailyMetric::TotalWalkingTime => session.total_walking_time,
            DailyMetric::MeanBoutDuration => session.mean_bout_duration,
            DailyMetric::MaxBoutDuration => session.max_bout_duration,
            DailyMetric::BoutCount => session.bout_count() as f64,
        }
    }
}

/// Population summary over all session folders under a root
#[derive(Debug, Clone, Serialize)]
pub struct CohortResult {
    /// Sessions in scan order
    pub sessions: Vec<SessionResult>,
    /// Every bout from every session with a bout table
    pub all_bouts: Vec<WalkingBout>,
    /// Every stride table stacked; `None` when no folder had one
    pub all_strides: Option<Table>,
    pub mean_cadence: Option<f64>,
    pub mean_stride_length: Option<f64>,
    pub mean_walking_speed: Option<f64>,
    pub mean_bout_duration: Option<f64>,
    pub max_bout_duration: Option<f64>,
    /// Mean of per-session walking time, sessions without bouts count as 0
    pub mean_daily_walking_time: f64,
    pub session_count: usize,
    pub bout_count: usize,
    pub skipped: Vec<SkippedFolder>,
    pub scan_failures: Vec<ScanFailure>,
}

impl CohortResult {
    /// Session with the smallest start timestamp (first one on ties)
    pub fn earliest_session(&self) -> Result<&SessionResult> {
        self.sessions
            .iter()
            .reduce(|best, s| {
                if s.start_timestamp < best.start_timestamp {
                    s
                } else {
                    best
                }
            })
            .ok_or(SummaryError::EmptyCohort)
    }

    /// Session with the largest start timestamp (first one on ties)
    pub fn latest_session(&self) -> Result<&SessionResult> {
        self.sessions
            .iter()
            .reduce(|best, s| {
                if s.start_timestamp > best.start_timestamp {
                    s
                } else {
                    best
                }
            })
            .ok_or(SummaryError::EmptyCohort)
    }

    /// `"<first day> - <last day>"`
    pub fn date_range_label(&self) -> Result<String> {
        Ok(format!(
            "{} - {}",
            self.earliest_session()?.day,
            self.latest_session()?.day
        ))
    }

    /// Sessions ordered by start timestamp; ties keep scan order
    pub fn sessions_chronological(&self) -> Vec<&SessionResult> {
        let mut ordered: Vec<&SessionResult> = self.sessions.iter().collect();
        ordered.sort_by_key(|s| s.start_timestamp);
        ordered
    }

    /// Sessions starting within `[from_ms, to_ms]`, in chronological order
    pub fn sessions_between(&self, from_ms: i64, to_ms: i64) -> Vec<&SessionResult> {
        self.sessions_chronological()
            .into_iter()
            .filter(|s| (from_ms..=to_ms).contains(&s.start_timestamp))
            .collect()
    }

    /// One row per session, labeled by day, in chronological order
    pub fn daily_series(&self, metric: DailyMetric) -> LabeledTable {
        let mut table = LabeledTable::new(metric.label());
        for session in self.sessions_chronological() {
            table.push(session.day.clone(), metric.value(session));
        }
        table
    }
}

/// Builds a `CohortResult` from a directory tree
#[derive(Debug, Clone, Default)]
pub struct CohortAggregator {
    config: AggregatorConfig,
}

impl CohortAggregator {
    /// Fails with `InvalidConfig` for a non-positive sample rate or an
    /// out-of-range clock offset.
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Scan `root` and parse every folder found.
    ///
    /// Each folder becomes a session even when it holds no artifacts. A folder
    /// with a malformed artifact aborts the scan, or is left out entirely
    /// under `FolderErrorPolicy::Skip`.
    pub fn collect_sessions(&self, root: &Path) -> Result<SessionBatch> {
        let scan = DirectoryScanner::scan(root)?;
        let parser = SessionParser::from_config(&self.config)?;

        let mut batch = SessionBatch {
            sessions: Vec::with_capacity(scan.folders.len()),
            skipped: Vec::new(),
            scan_failures: scan.failures,
        };

        for folder in &scan.folders {
            match parser.parse(folder) {
                Ok(session) => batch.sessions.push(session),
                Err(err @ SummaryError::DataFormat { .. })
                    if self.config.on_malformed_folder == FolderErrorPolicy::Skip =>
                {
                    warn!(folder = %folder.display(), error = %err, "skipping malformed session folder");
                    batch.skipped.push(SkippedFolder {
                        folder: folder.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(batch)
    }

    /// Scan `root`, parse every folder, and aggregate the sessions
    pub fn aggregate(&self, root: &Path) -> Result<CohortResult> {
        let batch = self.collect_sessions(root)?;

        let mut cohort = Self::from_sessions(batch.sessions)?;
        cohort.skipped = batch.skipped;
        cohort.scan_failures = batch.scan_failures;

        info!(
            root = %root.display(),
            sessions = cohort.session_count,
            bouts = cohort.bout_count,
            skipped = cohort.skipped.len(),
            "aggregated cohort"
        );

        Ok(cohort)
    }

    /// Aggregate already-parsed sessions
    pub fn from_sessions(sessions: Vec<SessionResult>) -> Result<CohortResult> {
        let all_bouts = concat_bouts(&sessions)?;
        let all_strides = Table::concat(sessions.iter().filter_map(|s| s.strides.as_ref()));

        let daily_times: Vec<f64> = sessions.iter().map(|s| s.total_walking_time).collect();
        let mean_daily_walking_time = daily_times.iter().sum::<f64>() / daily_times.len() as f64;

        Ok(CohortResult {
            mean_cadence: column_mean(&all_bouts, |b| b.record.cadence_spm),
            mean_stride_length: column_mean(&all_bouts, |b| b.record.stride_length_m),
            mean_walking_speed: column_mean(&all_bouts, |b| b.record.walking_speed_mps),
            mean_bout_duration: column_mean(&all_bouts, |b| b.record.duration_s),
            max_bout_duration: column_max(&all_bouts, |b| b.record.duration_s),
            mean_daily_walking_time,
            session_count: sessions.len(),
            bout_count: all_bouts.len(),
            all_bouts,
            all_strides,
            sessions,
            skipped: Vec::new(),
            scan_failures: Vec::new(),
        })
    }
}

/// Stack the bout tables of all sessions that have one.
///
/// Fails with `NoBoutData` when no session contributes a bout.
pub fn concat_bouts(sessions: &[SessionResult]) -> Result<Vec<WalkingBout>> {
    let all: Vec<WalkingBout> = sessions
        .iter()
        .filter_map(|s| s.bouts.as_ref())
        .flatten()
        .cloned()
        .collect();

    if all.is_empty() {
        return Err(SummaryError::NoBoutData);
    }
    Ok(all)
}

fn column_mean(bouts: &[WalkingBout], column: impl Fn(&WalkingBout) -> Option<f64>) -> Option<f64> {
    let (sum, count) = bouts
        .iter()
        .filter_map(column)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn column_max(bouts: &[WalkingBout], column: impl Fn(&WalkingBout) -> Option<f64>) -> Option<f64> {
    bouts.iter().filter_map(column).reduce(f64::max)
}
