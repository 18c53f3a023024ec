//! Remote property store boundary
//!
//! Participant properties (assessment history, questionnaire answers) come
//! from a project management service. The core only depends on the lookup
//! contract below.

use crate::error::{Result, SummaryError};
use crate::render::LabeledTable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Property holding one entry per past assessment day
pub const DMO_HISTORY_PROPERTY: &str = "dmo_history";
const START_DAY_KEY: &str = "StartDay";
const WALKING_SPEED_KEY: &str = "MeanWalkingSpeed";

/// Read-only lookup of participant property values
pub trait PropertyStore {
    fn lookup_property(
        &self,
        project_code: &str,
        participant_code: &str,
        property_name: &str,
    ) -> Result<Vec<Value>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PropertyEntry {
    project: String,
    participant: String,
    property: String,
    values: Vec<Value>,
}

/// Store backed by a map, loadable from a JSON array of
/// `{project, participant, property, values}` entries
#[derive(Debug, Clone, Default)]
pub struct InMemoryPropertyStore {
    entries: HashMap<(String, String, String), Vec<Value>>,
}

impl InMemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let entries: Vec<PropertyEntry> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for entry in entries {
            store.insert(&entry.project, &entry.participant, &entry.property, entry.values);
        }
        Ok(store)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SummaryError::io(path, e))?;
        Self::from_json(&content).map_err(|e| SummaryError::data_format(path, e))
    }

    pub fn insert(&mut self, project: &str, participant: &str, property: &str, values: Vec<Value>) {
        self.entries
            .entry((project.to_string(), participant.to_string(), property.to_string()))
            .or_default()
            .extend(values);
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn lookup_property(
        &self,
        project_code: &str,
        participant_code: &str,
        property_name: &str,
    ) -> Result<Vec<Value>> {
        let key = (
            project_code.to_string(),
            participant_code.to_string(),
            property_name.to_string(),
        );
        self.entries.get(&key).cloned().ok_or_else(|| {
            SummaryError::PropertyStore(format!(
                "no property '{}' for participant '{}' in project '{}'",
                property_name, participant_code, project_code
            ))
        })
    }
}

/// Fetch a participant's assessment history and chart its mean walking speed
/// per `StartDay`, oldest first.
pub fn walking_speed_history(
    store: &dyn PropertyStore,
    project_code: &str,
    participant_code: &str,
) -> Result<LabeledTable> {
    let values = store.lookup_property(project_code, participant_code, DMO_HISTORY_PROPERTY)?;
    assessment_series(&values, START_DAY_KEY, WALKING_SPEED_KEY)
}

/// Turn property entries into a labeled series.
///
/// Each entry must be an object with a string `label_key`. Entries whose
/// `value_key` is null or absent are left out; any other non-numeric value
/// is an error. Rows are ordered by label.
pub fn assessment_series(values: &[Value], label_key: &str, value_key: &str) -> Result<LabeledTable> {
    let mut rows = Vec::with_capacity(values.len());

    for entry in values {
        let label = entry.get(label_key).and_then(Value::as_str).ok_or_else(|| {
            SummaryError::PropertyStore(format!("entry without string '{}': {}", label_key, entry))
        })?;
        let value = match entry.get(value_key) {
            None | Some(Value::Null) => continue,
            Some(v) => v.as_f64().ok_or_else(|| {
                SummaryError::PropertyStore(format!(
                    "non-numeric '{}' for {}: {}",
                    value_key, label, v
                ))
            })?,
        };
        rows.push((label, value));
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut table = LabeledTable::new(value_key);
    for (label, value) in rows {
        table.push(label, value);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_from_json() {
        let store = InMemoryPropertyStore::from_json(
            r#"[{"project": "MOB", "participant": "P01", "property": "dmo_history",
                 "values": [{"StartDay": "2024-01-01", "MeanWalkingSpeed": 0.52}]}]"#,
        )
        .unwrap();

        let values = store.lookup_property("MOB", "P01", "dmo_history").unwrap();
        assert_eq!(values, vec![json!({"StartDay": "2024-01-01", "MeanWalkingSpeed": 0.52})]);
    }

    #[test]
    fn test_missing_property() {
        let store = InMemoryPropertyStore::new();
        let err = store.lookup_property("MOB", "P01", "cohort").unwrap_err();
        assert!(matches!(err, SummaryError::PropertyStore(_)));
    }

    #[test]
    fn test_insert_appends() {
        let mut store = InMemoryPropertyStore::new();
        store.insert("MOB", "P01", "weight", vec![json!(70)]);
        store.insert("MOB", "P01", "weight", vec![json!(71)]);

        let dyn_store: &dyn PropertyStore = &store;
        assert_eq!(
            dyn_store.lookup_property("MOB", "P01", "weight").unwrap(),
            vec![json!(70), json!(71)]
        );
    }

    #[test]
    fn test_walking_speed_history() {
        let mut store = InMemoryPropertyStore::new();
        store.insert(
            "MOB",
            "P01",
            DMO_HISTORY_PROPERTY,
            vec![
                json!({"StartDay": "2024-02-01", "MeanWalkingSpeed": 0.61}),
                json!({"StartDay": "2024-01-01", "MeanWalkingSpeed": 0.52}),
                json!({"StartDay": "2024-03-01", "MeanWalkingSpeed": null}),
            ],
        );

        let table = walking_speed_history(&store, "MOB", "P01").unwrap();
        assert_eq!(table.column, "MeanWalkingSpeed");
        assert_eq!(
            table.rows().to_vec(),
            vec![
                ("2024-01-01".to_string(), 0.52),
                ("2024-02-01".to_string(), 0.61),
            ]
        );

        let err = walking_speed_history(&store, "MOB", "P02").unwrap_err();
        assert!(matches!(err, SummaryError::PropertyStore(_)));
    }

    #[test]
    fn test_assessment_series_rejects_bad_entries() {
        let no_label = vec![json!({"MeanWalkingSpeed": 0.5})];
        assert!(matches!(
            assessment_series(&no_label, "StartDay", "MeanWalkingSpeed"),
            Err(SummaryError::PropertyStore(_))
        ));

        let text_value = vec![json!({"StartDay": "2024-01-01", "MeanWalkingSpeed": "fast"})];
        assert!(matches!(
            assessment_series(&text_value, "StartDay", "MeanWalkingSpeed"),
            Err(SummaryError::PropertyStore(_))
        ));
    }
}
