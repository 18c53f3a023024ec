//! Mobility Summary - Aggregation engine for walking-bout sessions
//!
//! Turns a tree of per-day session folders into a participant summary through
//! a deterministic pipeline: directory scan → per-folder parsing (time
//! reconstruction, hourly reduction) → cohort aggregation → report encoding.
//!
//! ## Modules
//!
//! - **Session parsing**: load `wb.csv`, `stride.csv`, `aggregated.csv`, and
//!   `metadata.json` from one folder and derive per-session statistics
//! - **Cohort aggregation**: population means, maxima, and chronological queries
//! - **Peer comparison**: participant vs. condition-group reference values
//! - **Collaborators**: chart rendering and property store boundaries

pub mod cohort;
pub mod config;
pub mod error;
pub mod hourly;
pub mod peer;
pub mod render;
pub mod report;
pub mod scanner;
pub mod session;
pub mod store;
pub mod time;
pub mod types;

pub use cohort::{CohortAggregator, CohortResult, DailyMetric};
pub use config::{AggregatorConfig, FolderErrorPolicy};
pub use error::SummaryError;
pub use peer::{PeerComparison, PeerTable};
pub use report::{ReportEncoder, ReportSummary};
pub use session::{SessionParser, SessionResult};

/// Crate version embedded in all report documents
pub const SUMMARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report documents
pub const PRODUCER_NAME: &str = "mobility-summary";

/// Sensor sample rate of the walking-bout tables
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 100.0;

pub const HOURS_PER_DAY: usize = 24;
