//! Error types for the watchdog rule.
//!
//! All errors are strongly typed using thiserror. The host-facing surface
//! (see [`crate::rule::NotificationRule`]) never propagates them: they are
//! logged and folded into the boolean results the host expects.

use thiserror::Error;

/// Errors raised while validating a rule configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The interval is negative or under the minimum.
    #[error("Interval {interval}ms is below the minimum of {minimum}ms")]
    IntervalBelowMinimum {
        /// Interval as configured.
        interval: i64,
        /// Smallest accepted interval.
        minimum: u64,
    },

    /// The source name is not one the rule knows.
    #[error("Unknown data source '{source_name}'")]
    UnknownSource {
        /// Source name as configured.
        source_name: String,
    },

    /// The category document has an unusable shape.
    #[error("Invalid configuration category: {reason}")]
    InvalidCategory {
        /// What was wrong.
        reason: String,
    },
}

/// Errors raised while reading an evaluation snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The text is not JSON.
    #[error("Snapshot is not valid JSON: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },

    /// The top level is not an object.
    #[error("Snapshot must be a JSON object")]
    NotAnObject,
}

/// Top-level error type for the watchdog rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchdogError {
    /// Configuration rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot unreadable.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Unexpected failure inside the rule.
    #[error("Internal error: {message}")]
    Internal {
        /// Failure description.
        message: String,
    },
}

impl WatchdogError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a snapshot error.
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for watchdog operations.
pub type WatchdogResult<T> = Result<T, WatchdogError>;
