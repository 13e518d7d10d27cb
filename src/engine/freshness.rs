//! Per-key freshness walk.
//!
//! Pure function over a trigger set and a snapshot; the engine calls it while
//! holding its lock and records the result.

use tracing::debug;

use crate::config::RULE_NAME;
use crate::snapshot::EvaluationSnapshot;
use crate::time::elapsed_millis;
use crate::trigger_set::{MonitoredKey, TriggerSet};

/// Why a key was judged stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Staleness {
    /// The snapshot has no observation for the key.
    Missing,
    /// The observation has no usable `timestamp_<key>` companion.
    NoTimestamp,
    /// The observation is at least one interval old.
    Expired {
        /// Age of the observation at evaluation time.
        age_ms: f64,
    },
}

/// Outcome of one walk over the monitored keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Every checked key is fresh (or was skipped by the datapoint filter).
    Fresh,
    /// The first stale key in enumeration order.
    Stale {
        /// The key that failed the check.
        key: MonitoredKey,
        /// What was wrong with it.
        cause: Staleness,
    },
}

impl Verdict {
    /// Whether some key was judged stale.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Walk `triggers` in order and stop at the first stale key.
///
/// `now` is the evaluation time in epoch seconds. With a `datapoint` filter,
/// keys whose observation lacks that datapoint are skipped rather than judged.
pub(crate) fn judge(
    triggers: &TriggerSet,
    snapshot: &EvaluationSnapshot,
    now: f64,
    interval_ms: u64,
    datapoint: Option<&str>,
) -> Verdict {
    #[allow(clippy::cast_precision_loss)]
    let threshold = interval_ms as f64;

    for key in triggers.keys() {
        if snapshot.observation(key).is_none() {
            return stale(key, Staleness::Missing);
        }

        if let Some(dp) = datapoint {
            if !snapshot.has_datapoint(key, dp) {
                debug!(rule = RULE_NAME, key = %key, datapoint = dp, "datapoint absent, key skipped");
                continue;
            }
        }

        let Some(observed_at) = snapshot.observed_at(key) else {
            return stale(key, Staleness::NoTimestamp);
        };

        let age_ms = elapsed_millis(now, observed_at);
        if age_ms >= threshold {
            return stale(key, Staleness::Expired { age_ms });
        }
    }

    Verdict::Fresh
}

fn stale(key: &MonitoredKey, cause: Staleness) -> Verdict {
    debug!(rule = RULE_NAME, key = %key, cause = ?cause, "stale key");
    Verdict::Stale {
        key: key.clone(),
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(value: serde_json::Value) -> EvaluationSnapshot {
        EvaluationSnapshot::from_value(value).unwrap()
    }

    fn set(names: &[&str]) -> TriggerSet {
        names.iter().copied().collect()
    }

    #[test]
    fn empty_set_is_fresh() {
        let v = judge(&TriggerSet::new(), &snap(json!({})), 100.0, 1000, None);
        assert_eq!(v, Verdict::Fresh);
    }

    #[test]
    fn missing_key_is_stale() {
        let s = snap(json!({"a": {}, "timestamp_a": 99.9}));
        let v = judge(&set(&["a", "b"]), &s, 100.0, 1000, None);
        assert_eq!(
            v,
            Verdict::Stale {
                key: MonitoredKey::new("b"),
                cause: Staleness::Missing
            }
        );
    }

    #[test]
    fn missing_timestamp_is_stale() {
        let s = snap(json!({"a": {}}));
        let v = judge(&set(&["a"]), &s, 100.0, 1000, None);
        assert!(matches!(
            v,
            Verdict::Stale {
                cause: Staleness::NoTimestamp,
                ..
            }
        ));
    }

    #[test]
    fn age_equal_to_interval_is_stale() {
        let s = snap(json!({"a": {}, "timestamp_a": 99.0}));
        let v = judge(&set(&["a"]), &s, 100.0, 1000, None);
        assert!(matches!(v, Verdict::Stale { cause: Staleness::Expired { .. }, .. }));

        let v = judge(&set(&["a"]), &s, 100.0, 1001, None);
        assert_eq!(v, Verdict::Fresh);
    }

    #[test]
    fn first_stale_key_in_order_wins() {
        let s = snap(json!({
            "a": {}, "timestamp_a": 99.99,
            "b": {}, "timestamp_b": 50.0,
            "c": {}
        }));
        let v = judge(&set(&["c", "b", "a"]), &s, 100.0, 1000, None);
        let Verdict::Stale { key, .. } = v else {
            panic!("expected stale verdict");
        };
        assert_eq!(key.as_str(), "b");
    }

    #[test]
    fn datapoint_filter_skips_keys_without_datapoint() {
        let s = snap(json!({
            "a": {"pressure": 1.0},
            "b": {"temp": 20.0}, "timestamp_b": 99.9
        }));
        let v = judge(&set(&["a", "b"]), &s, 100.0, 1000, Some("temp"));
        assert_eq!(v, Verdict::Fresh);
    }

    #[test]
    fn datapoint_filter_does_not_excuse_missing_keys() {
        let s = snap(json!({"b": {"temp": 20.0}, "timestamp_b": 99.9}));
        let v = judge(&set(&["a", "b"]), &s, 100.0, 1000, Some("temp"));
        assert!(v.is_stale());
    }
}
