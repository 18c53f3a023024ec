//! Peer comparison
//!
//! Compares a participant's population means against reference values for the
//! cohort (condition group) they belong to.

use crate::cohort::CohortResult;
use crate::error::{Result, SummaryError};
use crate::render::LabeledTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Reference means for one condition group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeerValues {
    /// Mean walking speed (m/s)
    pub mws: f64,
    /// Mean stride length (m)
    pub msl: f64,
    /// Mean cadence (steps/min)
    pub mc: f64,
}

/// Reference values keyed by cohort name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerTable {
    cohorts: BTreeMap<String, PeerValues>,
}

impl PeerTable {
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SummaryError::io(path, e))?;
        Self::from_json(&content).map_err(|e| SummaryError::data_format(path, e))
    }

    pub fn insert(&mut self, cohort: impl Into<String>, values: PeerValues) {
        self.cohorts.insert(cohort.into(), values);
    }

    pub fn get(&self, cohort: &str) -> Result<&PeerValues> {
        self.cohorts
            .get(cohort)
            .ok_or_else(|| SummaryError::UnknownCohort(cohort.to_string()))
    }
}

/// Metrics compared against the peer group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerMetric {
    WalkingSpeed,
    StrideLength,
    Cadence,
}

impl PeerMetric {
    pub const ALL: [PeerMetric; 3] = [
        PeerMetric::WalkingSpeed,
        PeerMetric::StrideLength,
        PeerMetric::Cadence,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            PeerMetric::WalkingSpeed => "Walking Speed",
            PeerMetric::StrideLength => "Stride Length",
            PeerMetric::Cadence => "Cadence",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            PeerMetric::WalkingSpeed => "walking speed",
            PeerMetric::StrideLength => "stride length",
            PeerMetric::Cadence => "cadence",
        }
    }

    /// (above, below) wording
    fn comparatives(&self) -> (&'static str, &'static str) {
        match self {
            PeerMetric::WalkingSpeed => ("faster", "slower"),
            PeerMetric::StrideLength => ("longer", "shorter"),
            PeerMetric::Cadence => ("higher", "lower"),
        }
    }

    fn participant_value(&self, cohort: &CohortResult) -> Option<f64> {
        match self {
            PeerMetric::WalkingSpeed => cohort.mean_walking_speed,
            PeerMetric::StrideLength => cohort.mean_stride_length,
            PeerMetric::Cadence => cohort.mean_cadence,
        }
    }

    fn peer_value(&self, peers: &PeerValues) -> f64 {
        match self {
            PeerMetric::WalkingSpeed => peers.mws,
            PeerMetric::StrideLength => peers.msl,
            PeerMetric::Cadence => peers.mc,
        }
    }
}

/// One metric set side by side with the peer reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: PeerMetric,
    pub participant: Option<f64>,
    pub peer: f64,
    /// Participant row first, cohort row second
    pub table: LabeledTable,
    pub comment: String,
}

/// Participant vs. condition-group comparison for the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerComparison {
    pub participant_id: String,
    pub cohort: String,
    pub metrics: Vec<MetricComparison>,
}

impl PeerComparison {
    pub fn build(
        participant_id: &str,
        cohort_name: &str,
        result: &CohortResult,
        peers: &PeerTable,
    ) -> Result<Self> {
        let reference = peers.get(cohort_name)?;

        let metrics = PeerMetric::ALL
            .iter()
            .map(|metric| {
                let participant = metric.participant_value(result);
                let peer = metric.peer_value(reference);

                let mut table = LabeledTable::new(metric.column());
                table.push(participant_id, participant.unwrap_or(0.0));
                table.push(cohort_name, peer);

                MetricComparison {
                    metric: *metric,
                    participant,
                    peer,
                    table,
                    comment: comment_for(*metric, participant, peer),
                }
            })
            .collect();

        Ok(Self {
            participant_id: participant_id.to_string(),
            cohort: cohort_name.to_string(),
            metrics,
        })
    }

    pub fn metric(&self, metric: PeerMetric) -> Option<&MetricComparison> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

fn comment_for(metric: PeerMetric, participant: Option<f64>, peer: f64) -> String {
    let Some(value) = participant else {
        return format!(
            "There is insufficient data to compare your {} with your condition",
            metric.noun()
        );
    };

    let (above, below) = metric.comparatives();
    let word = if value > peer { above } else { below };
    format!(
        "Your {} is {} than the average for your condition",
        metric.noun(),
        word
    )
}
