//! Rule configuration.
//!
//! The host hands the rule a configuration category: a handful of string
//! values (`asset`, `interval`, `source`, `datapoint`). [`RuleConfig`] holds
//! those raw values; [`RuleConfig::validate`] turns them into an
//! [`EngineConfig`] the engine can install atomically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::ConfigError;
use crate::trigger_set::MonitoredKey;

/// Rule name reported to the host and used as the log prefix.
pub const RULE_NAME: &str = "WatchDog";

/// Rule description reported to the host.
pub const RULE_DESCRIPTION: &str = "Generate a notification based on the last time of received data";

/// Interval used when the configured value is empty or not a number.
pub const DEFAULT_INTERVAL_MS: u64 = 5000;

/// Smallest interval the rule accepts.
pub const MIN_INTERVAL_MS: u64 = 10;

/// Where the monitored data comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    /// Asset readings.
    #[default]
    Readings,
    /// Statistics counters.
    Statistics,
    /// Per-interval statistics rates.
    #[serde(rename = "Statistics Rate")]
    StatisticsRate,
    /// Audit log codes.
    Audit,
}

impl DataSource {
    /// All sources, in the order the host displays them.
    pub const ALL: [Self; 4] = [Self::Readings, Self::Statistics, Self::StatisticsRate, Self::Audit];

    /// Configuration value naming this source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Readings => "Readings",
            Self::Statistics => "Statistics",
            Self::StatisticsRate => "Statistics Rate",
            Self::Audit => "Audit",
        }
    }

    /// Whether a datapoint filter applies to observations from this source.
    #[must_use]
    pub const fn supports_datapoint_filter(self) -> bool {
        matches!(self, Self::Readings)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownSource {
                source_name: s.to_string(),
            })
    }
}

/// Engine construction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Re-enter warm-up after every applied configuration, not only at construction.
    #[serde(default)]
    pub rearm_on_reconfigure: bool,
}

/// Raw configuration values as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Asset, statistic or audit code to monitor. May be a comma separated list.
    pub asset: String,
    /// Interval in milliseconds, as text.
    pub interval: String,
    /// Data source name.
    pub source: String,
    /// Datapoint that must be present in a reading, or empty for any.
    pub datapoint: String,
}

impl RuleConfig {
    /// Configuration watching `asset` with every other value defaulted.
    #[must_use]
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            ..Self::default()
        }
    }

    /// Set the interval text, in milliseconds.
    #[must_use]
    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    /// Set the source.
    #[must_use]
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = source.as_str().to_string();
        self
    }

    /// Set the source by its configuration value, unvalidated.
    #[must_use]
    pub fn with_source_name(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the datapoint filter; empty means any datapoint.
    #[must_use]
    pub fn with_datapoint(mut self, datapoint: impl Into<String>) -> Self {
        self.datapoint = datapoint.into();
        self
    }

    /// Parse a configuration category document.
    ///
    /// Each item may be a plain string or number, or an object carrying
    /// `"value"` (falling back to `"default"`). Missing items are empty.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCategory` if the document is not a JSON
    /// object or an item has an unusable shape.
    pub fn from_category_json(text: &str) -> Result<Self, ConfigError> {
        let doc: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ConfigError::InvalidCategory {
                reason: e.to_string(),
            })?;
        let Some(items) = doc.as_object() else {
            return Err(ConfigError::InvalidCategory {
                reason: "category must be a JSON object".to_string(),
            });
        };

        let item = |name: &str| -> Result<String, ConfigError> {
            match items.get(name) {
                None => Ok(String::new()),
                Some(v) => item_value(name, v),
            }
        };

        Ok(Self {
            asset: item("asset")?,
            interval: item("interval")?,
            source: item("source")?,
            datapoint: item("datapoint")?,
        })
    }

    /// Validate the raw values.
    ///
    /// Returns `Ok(None)` when no asset is configured yet; the host may
    /// configure the rule later.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownSource` for an unrecognised source and
    /// `ConfigError::IntervalBelowMinimum` for a numeric interval under
    /// [`MIN_INTERVAL_MS`].
    pub fn validate(&self) -> Result<Option<EngineConfig>, ConfigError> {
        let keys = parse_asset_list(&self.asset);
        if keys.is_empty() {
            return Ok(None);
        }

        let source: DataSource = self.source.parse()?;
        let interval_ms = parse_interval(&self.interval)?;
        let datapoint = Some(self.datapoint.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Some(EngineConfig {
            keys,
            interval_ms,
            source,
            datapoint,
        }))
    }
}

fn item_value(name: &str, value: &serde_json::Value) -> Result<String, ConfigError> {
    use serde_json::Value;

    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Object(obj) => match obj.get("value").or_else(|| obj.get("default")) {
            Some(inner @ (Value::String(_) | Value::Number(_) | Value::Null)) => item_value(name, inner),
            None => Ok(String::new()),
            Some(other) => Err(ConfigError::InvalidCategory {
                reason: format!("item '{name}' has a non-scalar value: {other}"),
            }),
        },
        other => Err(ConfigError::InvalidCategory {
            reason: format!("item '{name}' must be a string, number or object, got {other}"),
        }),
    }
}

/// Split a comma separated asset list, dropping blanks and duplicates.
fn parse_asset_list(text: &str) -> Vec<MonitoredKey> {
    let mut keys: Vec<MonitoredKey> = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(MonitoredKey::new)
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Parse the interval text, substituting the default for empty or non-numeric input.
pub(crate) fn parse_interval(text: &str) -> Result<u64, ConfigError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(DEFAULT_INTERVAL_MS);
    }

    let Ok(value) = text.parse::<i64>() else {
        warn!(
            rule = RULE_NAME,
            interval = %text,
            default_ms = DEFAULT_INTERVAL_MS,
            "interval is not an integer, using default"
        );
        return Ok(DEFAULT_INTERVAL_MS);
    };

    match u64::try_from(value) {
        Ok(ms) if ms >= MIN_INTERVAL_MS => Ok(ms),
        _ => Err(ConfigError::IntervalBelowMinimum {
            interval: value,
            minimum: MIN_INTERVAL_MS,
        }),
    }
}

/// Validated configuration, installed by the engine in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Keys to monitor, sorted and unique.
    pub keys: Vec<MonitoredKey>,
    /// Staleness threshold in milliseconds.
    pub interval_ms: u64,
    /// Where the keys' data comes from.
    pub source: DataSource,
    /// Datapoint filter; `None` means any datapoint counts.
    pub datapoint: Option<String>,
}

impl EngineConfig {
    /// The datapoint filter in effect, if the source supports one.
    #[must_use]
    pub fn active_datapoint_filter(&self) -> Option<&str> {
        if self.source.supports_datapoint_filter() {
            self.datapoint.as_deref()
        } else {
            None
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            interval_ms: DEFAULT_INTERVAL_MS,
            source: DataSource::default(),
            datapoint: None,
        }
    }
}

/// The configuration category the rule registers with its host.
#[must_use]
pub fn default_configuration() -> serde_json::Value {
    let options: Vec<&str> = DataSource::ALL.iter().map(|s| s.as_str()).collect();

    json!({
        "plugin": {
            "description": RULE_DESCRIPTION,
            "type": "string",
            "default": RULE_NAME,
            "readonly": "true"
        },
        "description": {
            "description": "Generate a notification if asset data is not present in time interval.",
            "type": "string",
            "default": "Generate a notification if asset data is not present in time interval.",
            "displayName": "Rule",
            "readonly": "true"
        },
        "source": {
            "description": "The source of the data to monitor.",
            "type": "enumeration",
            "options": options,
            "default": DataSource::Readings.as_str(),
            "displayName": "Data Source",
            "order": "2",
            "mandatory": "true"
        },
        "asset": {
            "description": "The name of the asset, statistics or audit code to monitor.",
            "type": "string",
            "default": "asset_1",
            "displayName": "Name",
            "order": "3",
            "mandatory": "true"
        },
        "datapoint": {
            "description": "The name of the datapoint that must exist within the asset, or blank if any datapoint can be used.",
            "type": "string",
            "default": "",
            "displayName": "Datapoint",
            "order": "4",
            "mandatory": "false",
            "validity": "source == \"Readings\""
        },
        "interval": {
            "description": "Watchdog interval expressed in milliseconds. The rule fires if the defined data is not observed within this interval",
            "name": "interval",
            "type": "integer",
            "default": DEFAULT_INTERVAL_MS.to_string(),
            "displayName": "Watchdog Timer (ms)",
            "order": "5",
            "mandatory": "true",
            "minimum": MIN_INTERVAL_MS.to_string()
        }
    })
}
