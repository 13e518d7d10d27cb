//! Evaluation snapshots.
//!
//! A snapshot is the flat JSON object the host passes on every evaluation
//! tick. For a monitored key `k` it may contain:
//!
//! - `k`: the latest observation (usually an object of datapoints)
//! - `timestamp_k`: when that observation was taken, in epoch seconds
//!
//! plus `timestamp__interval`, the moment the host scheduled this evaluation.

use serde_json::{Map, Value};

use crate::error::SnapshotError;
use crate::trigger_set::MonitoredKey;

/// Field carrying the evaluation time.
pub const EVALUATION_TIME_FIELD: &str = "timestamp__interval";

/// Read-only view over one evaluation input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationSnapshot {
    fields: Map<String, Value>,
}

impl EvaluationSnapshot {
    /// Parse snapshot text.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Parse` for malformed JSON and
    /// `SnapshotError::NotAnObject` when the top level is not an object.
    pub fn parse(text: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(text).map_err(|e| SnapshotError::Parse {
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Wrap an already decoded document.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::NotAnObject` when `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(SnapshotError::NotAnObject),
        }
    }

    /// Evaluation time in epoch seconds, if present and numeric.
    #[must_use]
    pub fn evaluation_time(&self) -> Option<f64> {
        self.fields.get(EVALUATION_TIME_FIELD).and_then(Value::as_f64)
    }

    /// The observation recorded for `key`, if any.
    #[must_use]
    pub fn observation(&self, key: &MonitoredKey) -> Option<&Value> {
        self.fields.get(key.as_str())
    }

    /// Observation time for `key` in epoch seconds.
    ///
    /// A non-numeric companion field counts as absent.
    #[must_use]
    pub fn observed_at(&self, key: &MonitoredKey) -> Option<f64> {
        self.fields.get(&key.timestamp_field()).and_then(Value::as_f64)
    }

    /// Whether the observation for `key` contains `datapoint`.
    ///
    /// Observations that are not objects never contain a datapoint.
    #[must_use]
    pub fn has_datapoint(&self, key: &MonitoredKey, datapoint: &str) -> bool {
        self.observation(key)
            .and_then(Value::as_object)
            .is_some_and(|obs| obs.contains_key(datapoint))
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the snapshot has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_rejects_malformed_and_non_objects() {
        assert!(matches!(
            EvaluationSnapshot::parse("{\"a\": "),
            Err(SnapshotError::Parse { .. })
        ));
        assert_eq!(
            EvaluationSnapshot::parse("[1]").unwrap_err(),
            SnapshotError::NotAnObject
        );
        assert_eq!(
            EvaluationSnapshot::parse("42").unwrap_err(),
            SnapshotError::NotAnObject
        );
    }

    #[test]
    fn reads_evaluation_time_and_key_fields() {
        let snap = EvaluationSnapshot::parse(
            r#"{"sensor1": {"temp": 21.5}, "timestamp_sensor1": 99.5, "timestamp__interval": 100}"#,
        )
        .unwrap();
        let key = MonitoredKey::new("sensor1");

        assert_eq!(snap.evaluation_time(), Some(100.0));
        assert_eq!(snap.observed_at(&key), Some(99.5));
        assert_eq!(snap.observation(&key), Some(&json!({"temp": 21.5})));
        assert!(snap.has_datapoint(&key, "temp"));
        assert!(!snap.has_datapoint(&key, "humidity"));
    }

    #[test]
    fn non_numeric_timestamps_count_as_absent() {
        let snap = EvaluationSnapshot::from_value(json!({
            "a": {},
            "timestamp_a": "yesterday",
            "timestamp__interval": null
        }))
        .unwrap();
        let key = MonitoredKey::new("a");

        assert_eq!(snap.evaluation_time(), None);
        assert_eq!(snap.observed_at(&key), None);
        assert!(snap.observation(&key).is_some());
    }

    #[test]
    fn scalar_observation_has_no_datapoints() {
        let snap = EvaluationSnapshot::from_value(json!({"a": 3})).unwrap();
        assert!(!snap.has_datapoint(&MonitoredKey::new("a"), "x"));
        assert!(!snap.has_datapoint(&MonitoredKey::new("missing"), "x"));
    }
}
