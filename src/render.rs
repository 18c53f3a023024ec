//! Chart collaborator boundary
//!
//! The core hands a renderer a labeled single-column table and a chart
//! description. Drawing itself happens outside this crate.

use crate::error::{Result, SummaryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default wrap width for y-axis labels on single charts
pub const AXIS_LABEL_WRAP: usize = 15;

/// Chart styles a renderer must support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            other => Err(SummaryError::InvalidChartKind(other.to_string())),
        }
    }
}

/// Labeled numeric series: an index of categories or days and one value column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledTable {
    /// Name of the value column
    pub column: String,
    rows: Vec<(String, f64)>,
}

impl LabeledTable {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, value: f64) {
        self.rows.push((label.into(), value));
    }

    pub fn rows(&self) -> &[(String, f64)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value range widened by 15% of its span, or by 0.05 when all values are
    /// equal. `None` for an empty table.
    pub fn padded_range(&self) -> Option<(f64, f64)> {
        let mut values = self.rows.iter().map(|(_, v)| *v).filter(|v| v.is_finite());
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let span = max - min;
        let margin = if span != 0.0 { span * 0.15 } else { 0.05 };
        Some((min - margin, max + margin))
    }
}

/// Everything a renderer needs besides the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub xlabel: String,
    pub ylabel: String,
    pub title: String,
}

impl ChartSpec {
    pub fn new(
        kind: ChartKind,
        xlabel: impl Into<String>,
        ylabel: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            xlabel: xlabel.into(),
            ylabel: ylabel.into(),
            title: title.into(),
        }
    }

    pub fn wrapped_ylabel(&self) -> String {
        wrap_axis_label(&self.ylabel, AXIS_LABEL_WRAP)
    }
}

/// Image producer for a labeled table
pub trait ChartRenderer {
    fn render(&self, data: &LabeledTable, spec: &ChartSpec, destination: &Path) -> Result<()>;
}

/// Break a long axis label onto two lines.
///
/// Splits at the last space within the first `max_len` characters, or hard
/// splits at `max_len` when there is none. Short labels are returned as is.
pub fn wrap_axis_label(label: &str, max_len: usize) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() <= max_len {
        return label.to_string();
    }

    let head: String = chars[..max_len].iter().collect();
    match head.rfind(' ') {
        Some(byte_idx) => {
            let split = head[..byte_idx].chars().count();
            let first: String = chars[..split].iter().collect();
            let rest: String = chars[split + 1..].iter().collect();
            format!("{}\n{}", first, rest)
        }
        None => {
            let rest: String = chars[max_len..].iter().collect();
            format!("{}\n{}", head, rest)
        }
    }
}
