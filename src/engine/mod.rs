//! Staleness engine.
//!
//! [`StalenessEngine`] is a passive object: the host configures it and then
//! calls [`StalenessEngine::evaluate`] on every scheduling tick. All mutable
//! state (trigger set, configuration, warm-up phase and the last outcome)
//! lives behind one mutex, so configuration and evaluation threads always
//! observe each other's updates whole.

mod freshness;

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, EngineOptions, RuleConfig, RULE_NAME};
use crate::error::{WatchdogError, WatchdogResult};
use crate::report::{Reason, ReasonDocument, TriggersDocument};
use crate::snapshot::EvaluationSnapshot;
use crate::time::format_epoch_seconds;
use crate::trigger_set::{MonitoredKey, TriggerSet, TriggerToken};

pub use freshness::{Staleness, Verdict};

/// Warm-up state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The next evaluation only arms the engine and reports not-triggered.
    WarmingUp,
    /// Evaluations judge freshness.
    Active,
}

/// Outcome of the most recent judging evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Whether the last judged evaluation found a stale key.
    pub triggered: bool,
    /// Keys responsible for the state: the stale key when triggered, every
    /// monitored key when cleared.
    pub evidence_keys: Vec<MonitoredKey>,
    /// Latest non-zero evaluation time (epoch seconds) seen by a judged
    /// evaluation. Kept across snapshots that carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_timestamp: Option<f64>,
}

/// Result of applying a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// The new trigger set and interval are installed.
    Applied,
    /// No asset was given; the previous configuration is untouched.
    Deferred,
}

#[derive(Debug)]
struct EngineInner {
    triggers: TriggerSet,
    config: EngineConfig,
    phase: Phase,
    state: EngineState,
}

/// Thread-safe staleness rule engine.
#[derive(Debug)]
pub struct StalenessEngine {
    options: EngineOptions,
    inner: Mutex<EngineInner>,
}

impl Default for StalenessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StalenessEngine {
    /// An unconfigured engine with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// An unconfigured engine with explicit options.
    #[must_use]
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            options,
            inner: Mutex::new(EngineInner {
                triggers: TriggerSet::new(),
                config: EngineConfig::default(),
                phase: Phase::WarmingUp,
                state: EngineState::default(),
            }),
        }
    }

    /// Build and configure an engine in one step.
    ///
    /// # Errors
    ///
    /// Returns the configuration error if `config` is invalid.
    pub fn from_config(config: &RuleConfig, options: EngineOptions) -> WatchdogResult<Self> {
        let engine = Self::with_options(options);
        engine.try_configure(config)?;
        Ok(engine)
    }

    /// Options the engine was built with.
    #[must_use]
    pub const fn options(&self) -> EngineOptions {
        self.options
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(rule = RULE_NAME, "engine lock poisoned, recovering state");
            poisoned.into_inner()
        })
    }

    /// Validate and install `config`.
    ///
    /// An empty asset defers configuration. Anything else replaces the
    /// trigger set, interval, source and datapoint filter in one step.
    ///
    /// # Errors
    ///
    /// Returns `WatchdogError::Config` when the values cannot be used; the
    /// previous configuration stays in place.
    pub fn try_configure(&self, config: &RuleConfig) -> WatchdogResult<ConfigureOutcome> {
        let Some(validated) = config.validate()? else {
            warn!(rule = RULE_NAME, "empty value for 'asset', configuration deferred");
            return Ok(ConfigureOutcome::Deferred);
        };
        self.apply(validated);
        Ok(ConfigureOutcome::Applied)
    }

    /// Install an already validated configuration.
    pub fn apply(&self, config: EngineConfig) {
        let mut inner = self.lock();

        inner.triggers.remove_all();
        for key in &config.keys {
            inner.triggers.add(key.clone(), TriggerToken::empty());
        }

        if self.options.rearm_on_reconfigure {
            inner.phase = Phase::WarmingUp;
        }

        info!(
            rule = RULE_NAME,
            keys = inner.triggers.len(),
            interval_ms = config.interval_ms,
            source = %config.source,
            datapoint = config.datapoint.as_deref().unwrap_or(""),
            "configuration applied"
        );
        inner.config = config;
    }

    /// Host-facing configure: `true` unless the values are unusable.
    pub fn configure(&self, config: &RuleConfig) -> bool {
        match self.try_configure(config) {
            Ok(_) => true,
            Err(e) => {
                warn!(rule = RULE_NAME, error = %e, "configuration rejected");
                false
            }
        }
    }

    /// Apply a configuration category document. Failures are logged only.
    pub fn reconfigure(&self, category: &str) {
        let result = RuleConfig::from_category_json(category)
            .map_err(WatchdogError::from)
            .and_then(|cfg| self.try_configure(&cfg));
        if let Err(e) = result {
            error!(rule = RULE_NAME, error = %e, "reconfigure failed");
        }
    }

    /// Evaluate snapshot text.
    ///
    /// Malformed input is logged and reported as not triggered; it neither
    /// consumes the warm-up tick nor changes the recorded state.
    pub fn evaluate(&self, snapshot: &str) -> bool {
        match EvaluationSnapshot::parse(snapshot) {
            Ok(snap) => self.evaluate_snapshot(&snap),
            Err(e) => {
                error!(rule = RULE_NAME, error = %e, "snapshot parse error");
                false
            }
        }
    }

    /// Evaluate a decoded snapshot.
    pub fn evaluate_snapshot(&self, snapshot: &EvaluationSnapshot) -> bool {
        let mut inner = self.lock();

        if inner.phase == Phase::WarmingUp {
            inner.phase = Phase::Active;
            debug!(rule = RULE_NAME, "first evaluation, warming up");
            return false;
        }

        let evaluated_at = snapshot.evaluation_time();
        let verdict = freshness::judge(
            &inner.triggers,
            snapshot,
            evaluated_at.unwrap_or(0.0),
            inner.config.interval_ms,
            inner.config.active_datapoint_filter(),
        );

        let triggered = verdict.is_stale();
        let evidence_keys = match verdict {
            Verdict::Stale { key, .. } => vec![key],
            Verdict::Fresh => inner.triggers.keys().cloned().collect(),
        };

        if triggered != inner.state.triggered {
            info!(
                rule = RULE_NAME,
                triggered,
                keys = ?evidence_keys,
                "rule state changed"
            );
        }

        let evidence_timestamp = evaluated_at
            .filter(|t| *t != 0.0)
            .or(inner.state.evidence_timestamp);
        inner.state = EngineState {
            triggered,
            evidence_keys,
            evidence_timestamp,
        };
        triggered
    }

    /// Copy of the last recorded outcome.
    #[must_use]
    pub fn current_state(&self) -> EngineState {
        self.lock().state.clone()
    }

    /// Current warm-up phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Copy of the configuration in effect.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.lock().config.clone()
    }

    /// Interval in effect, in milliseconds.
    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        self.lock().config.interval_ms
    }

    /// Monitored keys in evaluation order.
    #[must_use]
    pub fn monitored_keys(&self) -> Vec<MonitoredKey> {
        self.lock().triggers.keys().cloned().collect()
    }

    /// Trigger description for the host.
    #[must_use]
    pub fn describe_triggers(&self) -> TriggersDocument {
        let inner = self.lock();
        if inner.triggers.is_empty() {
            return TriggersDocument::empty();
        }
        TriggersDocument::new(inner.config.source, inner.triggers.keys(), inner.config.interval_ms)
    }

    /// Reason document for the last recorded outcome.
    #[must_use]
    pub fn describe_reason(&self) -> ReasonDocument {
        let state = self.current_state();
        ReasonDocument {
            reason: Reason::from_triggered(state.triggered),
            timestamp: state.evidence_timestamp.and_then(format_epoch_seconds),
            asset: state.evidence_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSource;

    fn engine(asset: &str, interval: &str) -> StalenessEngine {
        let engine = StalenessEngine::new();
        assert!(engine.configure(&RuleConfig::new(asset).with_interval(interval)));
        engine
    }

    fn armed(asset: &str, interval: &str) -> StalenessEngine {
        let engine = engine(asset, interval);
        assert!(!engine.evaluate("{}"));
        engine
    }

    #[test]
    fn first_evaluation_is_suppressed() {
        let engine = engine("sensor1", "1000");
        assert_eq!(engine.phase(), Phase::WarmingUp);

        // Would trigger if judged: sensor1 is missing.
        assert!(!engine.evaluate(r#"{"timestamp__interval": 100.0}"#));
        assert_eq!(engine.phase(), Phase::Active);
        assert_eq!(engine.current_state(), EngineState::default());

        assert!(engine.evaluate(r#"{"timestamp__interval": 100.0}"#));
    }

    #[test]
    fn malformed_snapshot_keeps_warm_up_and_state() {
        let engine = engine("sensor1", "1000");
        assert!(!engine.evaluate("not json"));
        assert_eq!(engine.phase(), Phase::WarmingUp);

        assert!(!engine.evaluate("{}"));
        assert!(engine.evaluate("{}"));
        let before = engine.current_state();

        assert!(!engine.evaluate("[1, 2, 3]"));
        assert_eq!(engine.current_state(), before);
    }

    #[test]
    fn triggered_state_names_the_stale_key() {
        let engine = armed("a,b", "1000");
        let snapshot = r#"{
            "a": {}, "timestamp_a": 99.9,
            "b": {}, "timestamp_b": 10.0,
            "timestamp__interval": 100.0
        }"#;
        assert!(engine.evaluate(snapshot));

        let state = engine.current_state();
        assert!(state.triggered);
        assert_eq!(state.evidence_keys, vec![MonitoredKey::new("b")]);
        assert_eq!(state.evidence_timestamp, Some(100.0));
    }

    #[test]
    fn cleared_state_lists_all_keys() {
        let engine = armed("b,a", "1000");
        let snapshot = r#"{
            "a": {}, "timestamp_a": 99.9,
            "b": {}, "timestamp_b": 99.5,
            "timestamp__interval": 100.0
        }"#;
        assert!(!engine.evaluate(snapshot));

        let state = engine.current_state();
        assert!(!state.triggered);
        assert_eq!(
            state.evidence_keys,
            vec![MonitoredKey::new("a"), MonitoredKey::new("b")]
        );
    }

    #[test]
    fn unconfigured_engine_never_triggers() {
        let engine = StalenessEngine::new();
        assert!(engine.configure(&RuleConfig::new("")));
        assert!(!engine.evaluate("{}"));
        assert!(!engine.evaluate("{}"));
        assert_eq!(engine.describe_triggers(), TriggersDocument::empty());
    }

    #[test]
    fn invalid_configuration_keeps_previous() {
        let engine = engine("a", "1000");
        assert!(!engine.configure(&RuleConfig::new("b").with_interval("5")));
        assert!(!engine.configure(&RuleConfig::new("b").with_source_name("Sensors")));

        assert_eq!(engine.monitored_keys(), vec![MonitoredKey::new("a")]);
        assert_eq!(engine.interval_ms(), 1000);
    }

    #[test]
    fn reconfigure_replaces_rather_than_merges() {
        let engine = engine("a,b", "1000");
        engine.reconfigure(r#"{"asset": {"value": "c"}, "interval": {"value": "2000"}, "source": {"value": "Audit"}}"#);

        assert_eq!(engine.monitored_keys(), vec![MonitoredKey::new("c")]);
        assert_eq!(engine.interval_ms(), 2000);
        assert_eq!(engine.config().source, DataSource::Audit);
    }

    #[test]
    fn reconfigure_with_garbage_is_ignored() {
        let engine = engine("a", "1000");
        engine.reconfigure("{{{");
        assert_eq!(engine.monitored_keys(), vec![MonitoredKey::new("a")]);
    }

    #[test]
    fn warm_up_is_not_rearmed_by_default() {
        let engine = armed("a", "1000");
        assert!(engine.configure(&RuleConfig::new("b").with_interval("1000")));
        assert_eq!(engine.phase(), Phase::Active);
        assert!(engine.evaluate("{}"));
    }

    #[test]
    fn warm_up_rearms_when_requested() {
        let engine = StalenessEngine::with_options(EngineOptions {
            rearm_on_reconfigure: true,
        });
        assert!(engine.configure(&RuleConfig::new("a")));
        assert!(!engine.evaluate("{}"));
        assert!(engine.evaluate("{}"));

        assert!(engine.configure(&RuleConfig::new("b")));
        assert_eq!(engine.phase(), Phase::WarmingUp);
        assert!(!engine.evaluate("{}"));
        assert!(engine.evaluate("{}"));
    }

    #[test]
    fn describe_reason_formats_timestamp() {
        let engine = armed("a", "1000");
        assert!(engine.evaluate(r#"{"timestamp__interval": 1622548800.5}"#));

        let reason = engine.describe_reason();
        assert_eq!(reason.reason, Reason::Triggered);
        assert_eq!(reason.asset, vec![MonitoredKey::new("a")]);
        assert_eq!(reason.timestamp.as_deref(), Some("2021-06-01T12:00:00.500000Z"));
    }

    #[test]
    fn describe_reason_without_evaluation_time_has_no_timestamp() {
        let engine = armed("a", "1000");
        assert!(engine.evaluate("{}"));
        assert_eq!(engine.describe_reason().timestamp, None);
    }

    #[test]
    fn evidence_timestamp_survives_ticks_without_evaluation_time() {
        let engine = armed("a", "1000");
        assert!(engine.evaluate(r#"{"timestamp__interval": 1622548800.0}"#));
        assert_eq!(
            engine.describe_reason().timestamp.as_deref(),
            Some("2021-06-01T12:00:00.000000Z")
        );

        assert!(engine.evaluate(r#"{"b": 1}"#));
        let reason = engine.describe_reason();
        assert_eq!(reason.asset, vec![MonitoredKey::new("a")]);
        assert_eq!(reason.timestamp.as_deref(), Some("2021-06-01T12:00:00.000000Z"));

        assert!(!engine.evaluate(r#"{"a": {}, "timestamp_a": 1622548801.0, "timestamp__interval": 1622548801.5}"#));
        assert_eq!(
            engine.describe_reason().timestamp.as_deref(),
            Some("2021-06-01T12:00:01.500000Z")
        );
    }

    #[test]
    fn zero_evaluation_time_is_not_recorded() {
        let engine = armed("a", "1000");
        assert!(engine.evaluate(r#"{"timestamp__interval": 0.0}"#));
        assert_eq!(engine.current_state().evidence_timestamp, None);
        assert_eq!(engine.describe_reason().timestamp, None);

        assert!(engine.evaluate(r#"{"timestamp__interval": 100.0}"#));
        assert!(engine.evaluate(r#"{"timestamp__interval": 0}"#));
        assert_eq!(engine.current_state().evidence_timestamp, Some(100.0));
    }

    #[test]
    fn from_config_rejects_bad_source() {
        let err = StalenessEngine::from_config(
            &RuleConfig::new("a").with_source_name("Sensors"),
            EngineOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_config());
    }
}
