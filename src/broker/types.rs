//! Value types exchanged with the broker capabilities.

use std::collections::HashMap;
use std::fmt;

/// Application option that marks units as managed by the controller rather than
/// by the orchestrator.
pub const MANAGED_UNITS_KEY: &str = "juju-managed-units";

/// Lifecycle stage of an upstream record.
///
/// The absence of the record is not a variant: life queries report it as
/// [`BrokerError::NotFound`](crate::BrokerError::NotFound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Life {
    Alive,
    Dying,
    Dead,
}

impl Life {
    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Life::Alive => "alive",
            Life::Dying => "dying",
            Life::Dead => "dead",
        }
    }
}

impl fmt::Display for Life {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single application option value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::String(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::String(v)
    }
}

/// Unordered application options with typed-default accessors.
///
/// # Example
/// ```
/// use unitvisor::{ApplicationConfig, ConfigValue, MANAGED_UNITS_KEY};
///
/// let cfg = ApplicationConfig::from_iter([(MANAGED_UNITS_KEY, ConfigValue::Bool(true))]);
/// assert!(cfg.get_bool(MANAGED_UNITS_KEY, false));
/// assert!(!cfg.get_bool("missing", false));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationConfig {
    values: HashMap<String, ConfigValue>,
}

impl ApplicationConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Option<ConfigValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Returns the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// Returns the boolean at `key`, or `default` when absent or not a boolean.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(ConfigValue::Bool(v)) => *v,
            _ => default,
        }
    }

    /// Returns the integer at `key`, or `default` when absent or not an integer.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(ConfigValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// Returns the string at `key`, or `default` when absent or not a string.
    pub fn get_string<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.values.get(key) {
            Some(ConfigValue::String(v)) => v,
            _ => default,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigValue)> for ApplicationConfig {
    fn from_iter<I: IntoIterator<Item = (K, ConfigValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// What the pod-spec accessor knows about how to deploy an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningInfo {
    /// Serialized pod specification.
    pub pod_spec: String,
}

/// Desired state handed to [`ServiceBroker::ensure_service`](crate::ServiceBroker::ensure_service).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceParams {
    /// Serialized pod specification.
    pub pod_spec: String,
    /// Number of alive units the service should run.
    pub num_units: usize,
    /// Whether units are managed by the controller rather than the orchestrator.
    pub managed_units: bool,
}

/// Status reported for an orchestrator object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub status: String,
    pub message: String,
}

/// Orchestrator-side view of an application's service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Orchestrator identifier of the service.
    pub id: String,
    pub addresses: Vec<String>,
    pub status: Status,
}

/// Orchestrator-side view of one unit (pod).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudUnit {
    /// Orchestrator identifier of the pod.
    pub id: String,
    pub address: String,
    pub ports: Vec<String>,
    pub status: Status,
}

/// Application status write, issued by the application worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateApplicationService {
    pub application: String,
    pub provider_id: String,
    pub addresses: Vec<String>,
    pub status: Status,
}

/// Unit status write, issued by the application worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUnits {
    pub application: String,
    pub units: Vec<CloudUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_bool_ignores_other_types() {
        let cfg = ApplicationConfig::from_iter([
            ("flag", ConfigValue::from("true")),
            ("count", ConfigValue::from(3_i64)),
        ]);
        assert!(!cfg.get_bool("flag", false));
        assert!(cfg.get_bool("count", true));
        assert_eq!(cfg.get_int("count", 0), 3);
        assert_eq!(cfg.get_string("flag", ""), "true");
    }

    #[test]
    fn test_insert_replaces_value() {
        let mut cfg = ApplicationConfig::new();
        assert!(cfg.insert(MANAGED_UNITS_KEY, false).is_none());
        assert_eq!(cfg.insert(MANAGED_UNITS_KEY, true), Some(ConfigValue::Bool(false)));
        assert!(cfg.get_bool(MANAGED_UNITS_KEY, false));
        assert_eq!(cfg.len(), 1);
    }

    #[test]
    fn test_life_display() {
        assert_eq!(Life::Dead.to_string(), "dead");
    }
}
