//! # watchdog-rule - Staleness detection for notification hosts
//!
//! A watchdog rule watches a set of data sources (assets, statistics or audit
//! codes) and fires when any of them stops producing fresh data within a
//! configured interval.
//!
//! ## Core Concepts
//!
//! - **Trigger set**: the ordered set of monitored keys
//! - **Snapshot**: the JSON document a host passes on each evaluation tick
//! - **Staleness engine**: the thread-safe state machine that judges snapshots
//!   and remembers why it last fired or cleared
//!
//! ## Usage
//!
//! ```rust
//! use watchdog_rule::{RuleConfig, StalenessEngine};
//!
//! let engine = StalenessEngine::new();
//! assert!(engine.configure(&RuleConfig::new("sensor1").with_interval("1000")));
//!
//! // The first tick only arms the engine.
//! assert!(!engine.evaluate(r#"{"timestamp__interval": 100.0}"#));
//!
//! // sensor1 last reported one full interval ago: stale.
//! assert!(engine.evaluate(
//!     r#"{"sensor1": {}, "timestamp_sensor1": 99.0, "timestamp__interval": 100.0}"#
//! ));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod rule;
pub mod snapshot;
pub mod time;
pub mod trigger_set;

// Re-export primary types at crate root for convenience
pub use config::{
    default_configuration, DataSource, EngineConfig, EngineOptions, RuleConfig,
    DEFAULT_INTERVAL_MS, MIN_INTERVAL_MS, RULE_NAME,
};
pub use engine::{ConfigureOutcome, EngineState, Phase, StalenessEngine, Staleness, Verdict};
pub use error::{ConfigError, SnapshotError, WatchdogError, WatchdogResult};
pub use report::{EvaluateMode, Reason, ReasonDocument, TriggerDescriptor, TriggersDocument};
pub use rule::{NotificationRule, RuleInfo};
pub use snapshot::{EvaluationSnapshot, EVALUATION_TIME_FIELD};
pub use trigger_set::{MonitoredKey, TriggerSet, TriggerToken};
