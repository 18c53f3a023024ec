//! Mobility CLI - Command-line interface for mobility summaries
//!
//! Commands:
//! - summarize: Aggregate a session tree into a report document
//! - sessions: List per-session statistics in scan order
//! - hourly: Print hourly stride and speed buckets per session

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mobility_summary::cohort::CohortAggregator;
use mobility_summary::hourly::HourlySpeed;
use mobility_summary::peer::{PeerComparison, PeerTable};
use mobility_summary::report::ReportEncoder;
use mobility_summary::{AggregatorConfig, FolderErrorPolicy, SummaryError, SUMMARY_VERSION};

/// Mobility - Aggregate walking-bout sessions into participant summaries
#[derive(Parser)]
#[command(name = "mobility")]
#[command(version = SUMMARY_VERSION)]
#[command(about = "Aggregate walking-bout sessions into mobility summaries", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format (always written to stderr)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    /// Load aggregation settings from a JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sensor sample rate in Hz
    #[arg(long, global = true)]
    sample_rate: Option<f64>,

    /// Fixed UTC offset in minutes for hour-of-day bucketing (default: local clock)
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,

    /// Skip folders with malformed artifacts instead of aborting
    #[arg(long, global = true)]
    skip_malformed: bool,

    /// Output file path (use - for stdout)
    #[arg(short, long, global = true, default_value = "-")]
    output: PathBuf,

    /// Pretty-print JSON (default when stdout is a terminal)
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a session tree into a report document
    Summarize {
        /// Root directory holding session folders
        root: PathBuf,

        /// Participant identifier shown in the report
        #[arg(long, default_value = "unknown")]
        participant: String,

        /// Peer reference values (JSON object keyed by cohort name)
        #[arg(long, requires = "cohort")]
        peers: Option<PathBuf>,

        /// Cohort the participant belongs to
        #[arg(long, requires = "peers")]
        cohort: Option<String>,
    },

    /// List per-session statistics in scan order
    Sessions {
        /// Root directory holding session folders
        root: PathBuf,
    },

    /// Print hourly stride and speed buckets per session
    Hourly {
        /// Root directory holding session folders
        root: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    Text,
    /// Structured JSON lines
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_level, &cli.global.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str, format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr).with_target(false))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr).with_target(false))
                .init();
        }
    }
}

fn run(cli: Cli) -> Result<(), MobilityCliError> {
    let config = build_config(&cli.global)?;
    let aggregator = CohortAggregator::new(config)?;
    let pretty = cli.global.pretty || atty::is(atty::Stream::Stdout);

    let output_data = match cli.command {
        Commands::Summarize {
            root,
            participant,
            peers,
            cohort,
        } => cmd_summarize(
            &aggregator,
            &root,
            &participant,
            peers.as_deref(),
            cohort.as_deref(),
            pretty,
        )?,
        Commands::Sessions { root } => cmd_sessions(&aggregator, &root, pretty)?,
        Commands::Hourly { root } => cmd_hourly(&aggregator, &root, pretty)?,
    };

    write_output(&cli.global.output, &output_data)
}

fn build_config(global: &GlobalArgs) -> Result<AggregatorConfig, MobilityCliError> {
    let mut config = match &global.config {
        Some(path) => AggregatorConfig::from_json_file(path)?,
        None => AggregatorConfig::default(),
    };

    if let Some(rate) = global.sample_rate {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(MobilityCliError::InvalidArgument(format!(
                "--sample-rate must be positive, got {}",
                rate
            )));
        }
        config.sample_rate_hz = rate;
    }
    if let Some(minutes) = global.utc_offset_minutes {
        let seconds = minutes.checked_mul(60).filter(|s| s.abs() < 86_400).ok_or_else(|| {
            MobilityCliError::InvalidArgument(format!(
                "--utc-offset-minutes out of range: {}",
                minutes
            ))
        })?;
        config.utc_offset_seconds = Some(seconds);
    }
    if global.skip_malformed {
        config.on_malformed_folder = FolderErrorPolicy::Skip;
    }

    Ok(config)
}

fn cmd_summarize(
    aggregator: &CohortAggregator,
    root: &Path,
    participant: &str,
    peers: Option<&Path>,
    cohort: Option<&str>,
    pretty: bool,
) -> Result<String, MobilityCliError> {
    let result = aggregator.aggregate(root)?;

    let peer = match (peers, cohort) {
        (Some(peers_path), Some(cohort_name)) => {
            let table = PeerTable::from_json_file(peers_path)?;
            Some(PeerComparison::build(participant, cohort_name, &result, &table)?)
        }
        _ => None,
    };

    info!(
        participant,
        sessions = result.session_count,
        "building report summary"
    );

    Ok(ReportEncoder::new().encode_to_json(participant, &result, peer, pretty)?)
}

fn cmd_sessions(
    aggregator: &CohortAggregator,
    root: &Path,
    pretty: bool,
) -> Result<String, MobilityCliError> {
    let batch = aggregator.collect_sessions(root)?;

    let rows: Vec<SessionRow> = batch
        .sessions
        .iter()
        .map(|s| SessionRow {
            folder: s.folder.display().to_string(),
            day: s.day.clone(),
            start_timestamp: s.start_timestamp,
            bout_count: s.bout_count(),
            stride_rows: s.strides.as_ref().map(|t| t.len()),
            total_walking_time: s.total_walking_time,
            mean_bout_duration: s.mean_bout_duration,
            max_bout_duration: s.max_bout_duration,
        })
        .collect();

    to_json(&rows, pretty)
}

fn cmd_hourly(
    aggregator: &CohortAggregator,
    root: &Path,
    pretty: bool,
) -> Result<String, MobilityCliError> {
    let batch = aggregator.collect_sessions(root)?;

    let rows: Vec<HourlyRow> = batch
        .sessions
        .iter()
        .map(|s| HourlyRow {
            day: &s.day,
            hours: &s.hourly_speed,
        })
        .collect();

    to_json(&rows, pretty)
}

// Helper functions

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, MobilityCliError> {
    let mut encoded = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    encoded.push('\n');
    Ok(encoded)
}

fn write_output(output: &Path, data: &str) -> Result<(), MobilityCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum MobilityCliError {
    Io(io::Error),
    Summary(SummaryError),
    Json(serde_json::Error),
    InvalidArgument(String),
}

impl From<io::Error> for MobilityCliError {
    fn from(e: io::Error) -> Self {
        MobilityCliError::Io(e)
    }
}

impl From<SummaryError> for MobilityCliError {
    fn from(e: SummaryError) -> Self {
        MobilityCliError::Summary(e)
    }
}

impl From<serde_json::Error> for MobilityCliError {
    fn from(e: serde_json::Error) -> Self {
        MobilityCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MobilityCliError> for CliError {
    fn from(e: MobilityCliError) -> Self {
        match e {
            MobilityCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the output path and permissions".to_string()),
            },
            MobilityCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            MobilityCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run 'mobility --help' for usage".to_string()),
            },
            MobilityCliError::Summary(e) => {
                let (code, hint) = match &e {
                    SummaryError::Io { .. } => (
                        "IO_ERROR",
                        Some("Check that the root directory exists and is readable"),
                    ),
                    SummaryError::DataFormat { .. } => (
                        "DATA_FORMAT_ERROR",
                        Some("Fix the named file or rerun with --skip-malformed"),
                    ),
                    SummaryError::NoBoutData => (
                        "NO_BOUT_DATA",
                        Some("Ensure at least one session folder contains a non-empty wb.csv"),
                    ),
                    SummaryError::EmptyCohort => ("EMPTY_COHORT", None),
                    SummaryError::UnknownCohort(_) => (
                        "UNKNOWN_COHORT",
                        Some("Check the cohort name against the peers file"),
                    ),
                    SummaryError::InvalidChartKind(_) => ("INVALID_CHART_KIND", None),
                    SummaryError::Render(_) => ("RENDER_ERROR", None),
                    SummaryError::PropertyStore(_) => ("PROPERTY_STORE_ERROR", None),
                    SummaryError::InvalidConfig(_) => (
                        "INVALID_CONFIG",
                        Some("Check --sample-rate, --utc-offset-minutes and the config file"),
                    ),
                    SummaryError::Encoding(_) => ("ENCODING_ERROR", None),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct SessionRow {
    folder: String,
    day: String,
    start_timestamp: i64,
    bout_count: usize,
    stride_rows: Option<usize>,
    total_walking_time: f64,
    mean_bout_duration: f64,
    max_bout_duration: f64,
}

#[derive(serde::Serialize)]
struct HourlyRow<'a> {
    day: &'a str,
    hours: &'a HourlySpeed,
}
