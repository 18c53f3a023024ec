//! Error types for mobility summaries

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning, parsing, or aggregating sessions
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed data in {}: {message}", .file.display())]
    DataFormat { file: PathBuf, message: String },

    #[error("No walking bout data found in any session")]
    NoBoutData,

    #[error("Cohort contains no sessions")]
    EmptyCohort,

    #[error("Unknown peer cohort: {0}")]
    UnknownCohort(String),

    #[error("Invalid chart kind: {0}")]
    InvalidChartKind(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Property store error: {0}")]
    PropertyStore(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl SummaryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SummaryError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn data_format(file: impl Into<PathBuf>, message: impl ToString) -> Self {
        SummaryError::DataFormat {
            file: file.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SummaryError>;
