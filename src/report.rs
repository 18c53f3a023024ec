//! Report encoding
//!
//! Collects the scalars a report template needs from a cohort result and wraps
//! them with producer metadata in a JSON document.

use crate::cohort::CohortResult;
use crate::error::{Result, SummaryError};
use crate::peer::PeerComparison;
use crate::{PRODUCER_NAME, SUMMARY_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report document version
pub const REPORT_VERSION: &str = "1.0.0";

pub const REPORT_TITLE: &str = "Mobility Report";

/// Report producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at_utc: String,
}

/// Headline numbers for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub title: String,
    pub participant_id: String,
    pub session_count: usize,
    pub bout_count: usize,
    pub mean_cadence: Option<f64>,
    pub mean_walking_speed: Option<f64>,
    pub mean_stride_length: Option<f64>,
    pub mean_bout_duration: Option<f64>,
    pub max_bout_duration: Option<f64>,
    pub start_day: String,
    pub end_day: String,
    pub date_range: String,
    pub mean_daily_walking_time_s: f64,
    pub mean_daily_walking_time_h: f64,
}

impl ReportSummary {
    /// Fails with `EmptyCohort` when the result holds no sessions
    pub fn build(participant_id: &str, cohort: &CohortResult) -> Result<Self> {
        let earliest = cohort.earliest_session()?;
        let latest = cohort.latest_session()?;

        Ok(Self {
            title: REPORT_TITLE.to_string(),
            participant_id: participant_id.to_string(),
            session_count: cohort.session_count,
            bout_count: cohort.bout_count,
            mean_cadence: cohort.mean_cadence,
            mean_walking_speed: cohort.mean_walking_speed,
            mean_stride_length: cohort.mean_stride_length,
            mean_bout_duration: cohort.mean_bout_duration,
            max_bout_duration: cohort.max_bout_duration,
            start_day: earliest.day.clone(),
            end_day: latest.day.clone(),
            date_range: format!("{} - {}", earliest.day, latest.day),
            mean_daily_walking_time_s: cohort.mean_daily_walking_time,
            mean_daily_walking_time_h: cohort.mean_daily_walking_time / 3600.0,
        })
    }
}

/// Complete report payload
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub report_version: String,
    pub producer: ReportProducer,
    pub summary: ReportSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<PeerComparison>,
}

/// Encoder stamping each document with a stable instance id
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(
        &self,
        participant_id: &str,
        cohort: &CohortResult,
        peer: Option<PeerComparison>,
    ) -> Result<ReportDocument> {
        Ok(ReportDocument {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: SUMMARY_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            summary: ReportSummary::build(participant_id, cohort)?,
            peer,
        })
    }

    pub fn encode_to_json(
        &self,
        participant_id: &str,
        cohort: &CohortResult,
        peer: Option<PeerComparison>,
        pretty: bool,
    ) -> Result<String> {
        let document = self.encode(participant_id, cohort, peer)?;
        let encoded = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortAggregator;
    use crate::peer::PeerTable;
    use crate::session::tests::{utc_parser, write_session};

    fn two_day_cohort() -> CohortResult {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        write_session(a.path(), "2024-02-02", 2_000, Some("0,100,7200.0,100,1.0,1.5,4\n"));
        write_session(b.path(), "2024-02-01", 1_000, None);

        let parser = utc_parser();
        CohortAggregator::from_sessions(vec![
            parser.parse(a.path()).unwrap(),
            parser.parse(b.path()).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_summary_fields() {
        let summary = ReportSummary::build("P01", &two_day_cohort()).unwrap();

        assert_eq!(summary.title, "Mobility Report");
        assert_eq!(summary.session_count, 2);
        assert_eq!(summary.bout_count, 1);
        assert_eq!(summary.start_day, "2024-02-01");
        assert_eq!(summary.end_day, "2024-02-02");
        assert_eq!(summary.date_range, "2024-02-01 - 2024-02-02");
        assert_eq!(summary.mean_daily_walking_time_s, 3600.0);
        assert_eq!(summary.mean_daily_walking_time_h, 1.0);
        assert_eq!(summary.mean_walking_speed, Some(1.5));
    }

    #[test]
    fn test_summary_on_empty_cohort() {
        let mut cohort = two_day_cohort();
        cohort.sessions.clear();
        assert!(matches!(
            ReportSummary::build("P01", &cohort),
            Err(SummaryError::EmptyCohort)
        ));
    }

    #[test]
    fn test_document_json() {
        let cohort = two_day_cohort();
        let peers =
            PeerTable::from_json(r#"{"PD": {"mws": 1.0, "msl": 1.0, "mc": 90.0}}"#).unwrap();
        let peer = PeerComparison::build("P01", "PD", &cohort, &peers).unwrap();

        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let json = encoder
            .encode_to_json("P01", &cohort, Some(peer), false)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["report_version"], "1.0.0");
        assert_eq!(value["producer"]["name"], "mobility-summary");
        assert_eq!(value["producer"]["instance_id"], "test-instance");
        assert_eq!(value["summary"]["participant_id"], "P01");
        assert_eq!(value["peer"]["cohort"], "PD");
        assert_eq!(value["peer"]["metrics"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_document_without_peer_omits_block() {
        let json = ReportEncoder::new()
            .encode_to_json("P01", &two_day_cohort(), None, true)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("peer").is_none());
    }

    #[test]
    fn test_serializer_failures_are_encoding_errors() {
        fn encode(value: &serde_json::Value) -> Result<String> {
            Ok(serde_json::to_string(value)?)
        }
        assert!(encode(&serde_json::json!({"a": 1})).is_ok());

        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SummaryError::from(bad);
        assert!(matches!(err, SummaryError::Encoding(_)));
        assert!(err.to_string().starts_with("Encoding error:"));
    }
}
