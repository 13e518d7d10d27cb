//! Documents the rule hands back to its host.
//!
//! Field names here are part of the host contract: hosts key on `triggers`,
//! `interval`, `reason`, `asset` and `timestamp` verbatim.

use serde::{Deserialize, Serialize};

use crate::config::DataSource;
use crate::error::{WatchdogError, WatchdogResult};
use crate::trigger_set::MonitoredKey;

/// One entry of the trigger list, tagged by data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerDescriptor {
    /// `{"asset": key}`
    Asset(MonitoredKey),
    /// `{"statistic": key}`
    Statistic(MonitoredKey),
    /// `{"statisticRate": key}`
    StatisticRate(MonitoredKey),
    /// `{"audit": key}`
    Audit(MonitoredKey),
}

impl TriggerDescriptor {
    /// Descriptor for `key` under the tag `source` uses.
    #[must_use]
    pub fn new(source: DataSource, key: MonitoredKey) -> Self {
        match source {
            DataSource::Readings => Self::Asset(key),
            DataSource::Statistics => Self::Statistic(key),
            DataSource::StatisticsRate => Self::StatisticRate(key),
            DataSource::Audit => Self::Audit(key),
        }
    }

    /// The monitored key.
    #[must_use]
    pub const fn key(&self) -> &MonitoredKey {
        match self {
            Self::Asset(k) | Self::Statistic(k) | Self::StatisticRate(k) | Self::Audit(k) => k,
        }
    }
}

/// How the host should combine trigger arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluateMode {
    /// Evaluate whenever any trigger delivers data.
    Any,
}

/// Trigger description returned to the host.
///
/// An unconfigured rule serializes as `{"triggers":[]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggersDocument {
    /// Monitored keys, in evaluation order.
    pub triggers: Vec<TriggerDescriptor>,
    /// Evaluation interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Combination mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluate: Option<EvaluateMode>,
}

impl TriggersDocument {
    /// Document for a rule with nothing to watch.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            triggers: Vec::new(),
            interval: None,
            evaluate: None,
        }
    }

    /// Document listing `keys` under the tag for `source`.
    #[must_use]
    pub fn new<'a>(
        source: DataSource,
        keys: impl IntoIterator<Item = &'a MonitoredKey>,
        interval_ms: u64,
    ) -> Self {
        let triggers: Vec<TriggerDescriptor> = keys
            .into_iter()
            .map(|k| TriggerDescriptor::new(source, k.clone()))
            .collect();
        if triggers.is_empty() {
            return Self::empty();
        }
        Self {
            triggers,
            interval: Some(interval_ms),
            evaluate: Some(EvaluateMode::Any),
        }
    }

    /// Serialize to the host's JSON form.
    ///
    /// # Errors
    ///
    /// Returns `WatchdogError::Internal` if serialization fails.
    pub fn to_json(&self) -> WatchdogResult<String> {
        serde_json::to_string(self)
            .map_err(|e| WatchdogError::internal(format!("failed to encode triggers: {e}")))
    }
}

/// Rule outcome named in the reason document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reason {
    /// A monitored key went stale.
    Triggered,
    /// Every monitored key is fresh.
    Cleared,
}

impl Reason {
    /// Map the engine's triggered flag.
    #[must_use]
    pub const fn from_triggered(triggered: bool) -> Self {
        if triggered {
            Self::Triggered
        } else {
            Self::Cleared
        }
    }
}

/// Why the rule is in its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonDocument {
    /// Current outcome.
    pub reason: Reason,
    /// Evidence keys behind the outcome.
    pub asset: Vec<MonitoredKey>,
    /// ISO-8601 UTC; present only once an evaluation time has been recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ReasonDocument {
    /// Serialize to the host's JSON form.
    ///
    /// # Errors
    ///
    /// Returns `WatchdogError::Internal` if serialization fails.
    pub fn to_json(&self) -> WatchdogResult<String> {
        serde_json::to_string(self)
            .map_err(|e| WatchdogError::internal(format!("failed to encode reason: {e}")))
    }
}
