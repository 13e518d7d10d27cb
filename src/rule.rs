//! Host-facing rule contract.
//!
//! A notification host drives rules through string documents: it configures
//! them, feeds JSON snapshots, and asks for the trigger list and the reason
//! behind the current state. [`NotificationRule`] is that seam; the host
//! adapter (plugin loader, FFI shim, test harness) sits on the other side.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::{default_configuration, RuleConfig, RULE_NAME};
use crate::engine::StalenessEngine;
use crate::report::Reason;

/// Interface version of the rule contract.
pub const INTERFACE_VERSION: &str = "1.0.0";

/// Kind of plugin a rule registers as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PluginType {
    /// A rule evaluated by the notification service.
    NotificationRule,
}

/// Registration metadata reported to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleInfo {
    /// Rule name.
    pub name: String,
    /// Crate version.
    pub version: String,
    /// Host plugin flags; always zero.
    pub flags: u32,
    /// Plugin kind.
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    /// Contract version the rule implements.
    pub interface_version: String,
    /// Default configuration category.
    pub config: serde_json::Value,
}

impl RuleInfo {
    /// Metadata for the watchdog rule.
    #[must_use]
    pub fn watchdog() -> Self {
        Self {
            name: RULE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            flags: 0,
            plugin_type: PluginType::NotificationRule,
            interface_version: INTERFACE_VERSION.to_string(),
            config: default_configuration(),
        }
    }
}

/// Operations a notification host invokes on a rule.
///
/// None of these fail toward the host: errors are logged and folded into
/// the documented return values.
pub trait NotificationRule: Send + Sync {
    /// Registration metadata.
    fn info(&self) -> RuleInfo;

    /// Apply configuration. `false` means the host should keep the previous one.
    fn configure(&self, config: &RuleConfig) -> bool;

    /// Evaluate one snapshot document; `true` when the rule fires.
    fn evaluate(&self, snapshot: &str) -> bool;

    /// Trigger list document.
    fn triggers(&self) -> String;

    /// Reason document for the current state.
    fn reason(&self) -> String;

    /// Apply a configuration category document, best effort.
    fn reconfigure(&self, category: &str);
}

impl NotificationRule for StalenessEngine {
    fn info(&self) -> RuleInfo {
        RuleInfo::watchdog()
    }

    fn configure(&self, config: &RuleConfig) -> bool {
        Self::configure(self, config)
    }

    fn evaluate(&self, snapshot: &str) -> bool {
        Self::evaluate(self, snapshot)
    }

    fn triggers(&self) -> String {
        let doc = self.describe_triggers();
        let out = doc.to_json().unwrap_or_else(|e| {
            error!(rule = RULE_NAME, error = %e, "triggers document");
            r#"{"triggers":[]}"#.to_string()
        });
        debug!(rule = RULE_NAME, triggers = %out, "plugin_triggers");
        out
    }

    fn reason(&self) -> String {
        let doc = self.describe_reason();
        let out = doc.to_json().unwrap_or_else(|e| {
            error!(rule = RULE_NAME, error = %e, "reason document");
            let reason = match doc.reason {
                Reason::Triggered => "triggered",
                Reason::Cleared => "cleared",
            };
            format!(r#"{{"reason":"{reason}","asset":[]}}"#)
        });
        debug!(rule = RULE_NAME, reason = %out, "plugin_reason");
        out
    }

    fn reconfigure(&self, category: &str) {
        Self::reconfigure(self, category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_rule(engine: &StalenessEngine) -> &dyn NotificationRule {
        engine
    }

    #[test]
    fn info_describes_the_watchdog() {
        let info = RuleInfo::watchdog();
        assert_eq!(info.name, "WatchDog");
        assert_eq!(info.interface_version, "1.0.0");

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["type"], "notificationRule");
        assert_eq!(value["config"]["interval"]["default"], "5000");
    }

    #[test]
    fn trait_surface_round_trips_documents() {
        let engine = StalenessEngine::new();
        let rule = as_rule(&engine);

        assert!(rule.configure(&RuleConfig::new("pump").with_interval("1000")));
        let triggers: serde_json::Value = serde_json::from_str(&rule.triggers()).unwrap();
        assert_eq!(triggers["triggers"], json!([{"asset": "pump"}]));
        assert_eq!(triggers["interval"], 1000);

        assert!(!rule.evaluate(r#"{"timestamp__interval": 10.0}"#));
        assert!(rule.evaluate(r#"{"timestamp__interval": 10.0}"#));

        let reason: serde_json::Value = serde_json::from_str(&rule.reason()).unwrap();
        assert_eq!(reason["reason"], "triggered");
        assert_eq!(reason["asset"], json!(["pump"]));
        assert_eq!(reason["timestamp"], "1970-01-01T00:00:10.000000Z");
    }

    #[test]
    fn unconfigured_rule_reports_empty_triggers() {
        let engine = StalenessEngine::new();
        assert_eq!(as_rule(&engine).triggers(), r#"{"triggers":[]}"#);
        assert_eq!(as_rule(&engine).reason(), r#"{"reason":"cleared","asset":[]}"#);
    }
}
