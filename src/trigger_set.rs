//! Monitored keys and the trigger set that holds them.
//!
//! A trigger set maps each monitored key to an opaque [`TriggerToken`]. The
//! engine only cares about which keys are present; tokens exist so hosts can
//! hang metadata off a trigger later without changing the set's shape.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a data source (asset, statistic or audit code) being watched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitoredKey(String);

impl MonitoredKey {
    /// Wrap a key name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The key name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the companion field carrying this key's observation time.
    #[must_use]
    pub fn timestamp_field(&self) -> String {
        format!("timestamp_{}", self.0)
    }
}

impl fmt::Display for MonitoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MonitoredKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MonitoredKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MonitoredKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque per-key payload. Never inspected by evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

impl TriggerToken {
    /// A token without metadata.
    #[must_use]
    pub const fn empty() -> Self {
        Self { metadata: None }
    }

    /// A token carrying host metadata.
    #[must_use]
    pub fn with_metadata(metadata: serde_json::Value) -> Self {
        Self {
            metadata: Some(metadata),
        }
    }

    /// Host metadata, if any.
    #[must_use]
    pub const fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }
}

/// Ordered set of monitored keys.
///
/// Enumeration is lexicographic by key, so repeated evaluations over the same
/// content visit keys (and report evidence) in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerSet {
    entries: BTreeMap<MonitoredKey, TriggerToken>,
}

impl TriggerSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key. An existing entry for the same key is overwritten.
    pub fn add(&mut self, key: impl Into<MonitoredKey>, token: TriggerToken) {
        self.entries.insert(key.into(), token);
    }

    /// Drop every entry.
    pub fn remove_all(&mut self) {
        self.entries.clear();
    }

    /// Whether the set has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether `key` is monitored.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Token stored for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TriggerToken> {
        self.entries.get(key)
    }

    /// Entries in stable order. Each call starts a fresh pass.
    pub fn entries(&self) -> impl Iterator<Item = (&MonitoredKey, &TriggerToken)> + '_ {
        self.entries.iter()
    }

    /// Keys in stable order.
    pub fn keys(&self) -> impl Iterator<Item = &MonitoredKey> + '_ {
        self.entries.keys()
    }
}

impl<K: Into<MonitoredKey>> FromIterator<K> for TriggerSet {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.add(key, TriggerToken::empty());
        }
        set
    }
}
