//! # Provisioner configuration.
//!
//! [`ProvisionerConfig`] is a fixed set of named capability fields, all mandatory,
//! plus the observability settings. [`validate`](ProvisionerConfig::validate)
//! checks the capabilities in declaration order and fails on the first missing one,
//! naming it; nothing is started for an invalid configuration.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by [`ProvisionerConfig::bus_capacity_clamped`]

use std::sync::Arc;

use crate::broker::{
    ApplicationGetter, ApplicationUpdater, ContainerBroker, LifeGetter, PodSpecGetter,
    ServiceBroker, UnitGetter, UnitUpdater,
};
use crate::error::ConfigError;
use crate::subscribers::Subscribe;

/// Configuration for [`Provisioner::start`](crate::Provisioner::start).
///
/// All capability fields are public for flexibility; the `with_*` setters make
/// construction read top to bottom.
#[derive(Clone)]
pub struct ProvisionerConfig {
    pub application_getter: Option<Arc<dyn ApplicationGetter>>,
    pub application_updater: Option<Arc<dyn ApplicationUpdater>>,
    pub service_broker: Option<Arc<dyn ServiceBroker>>,
    pub container_broker: Option<Arc<dyn ContainerBroker>>,
    pub pod_spec_getter: Option<Arc<dyn PodSpecGetter>>,
    pub life_getter: Option<Arc<dyn LifeGetter>>,
    pub unit_getter: Option<Arc<dyn UnitGetter>>,
    pub unit_updater: Option<Arc<dyn UnitUpdater>>,

    /// Event subscribers (logging, metrics, ...). Empty by default.
    pub subscribers: Vec<Arc<dyn Subscribe>>,

    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,
}

impl Default for ProvisionerConfig {
    /// No capabilities, no subscribers, `bus_capacity = 1024`.
    fn default() -> Self {
        Self {
            application_getter: None,
            application_updater: None,
            service_broker: None,
            container_broker: None,
            pod_spec_getter: None,
            life_getter: None,
            unit_getter: None,
            unit_updater: None,
            subscribers: Vec::new(),
            bus_capacity: 1024,
        }
    }
}

impl ProvisionerConfig {
    pub fn with_application_getter(mut self, v: Arc<dyn ApplicationGetter>) -> Self {
        self.application_getter = Some(v);
        self
    }

    pub fn with_application_updater(mut self, v: Arc<dyn ApplicationUpdater>) -> Self {
        self.application_updater = Some(v);
        self
    }

    pub fn with_service_broker(mut self, v: Arc<dyn ServiceBroker>) -> Self {
        self.service_broker = Some(v);
        self
    }

    pub fn with_container_broker(mut self, v: Arc<dyn ContainerBroker>) -> Self {
        self.container_broker = Some(v);
        self
    }

    pub fn with_pod_spec_getter(mut self, v: Arc<dyn PodSpecGetter>) -> Self {
        self.pod_spec_getter = Some(v);
        self
    }

    pub fn with_life_getter(mut self, v: Arc<dyn LifeGetter>) -> Self {
        self.life_getter = Some(v);
        self
    }

    pub fn with_unit_getter(mut self, v: Arc<dyn UnitGetter>) -> Self {
        self.unit_getter = Some(v);
        self
    }

    pub fn with_unit_updater(mut self, v: Arc<dyn UnitUpdater>) -> Self {
        self.unit_updater = Some(v);
        self
    }

    /// Sets event subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks that every capability is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capabilities().map(|_| ())
    }

    /// Extracts the validated capability set.
    pub fn capabilities(&self) -> Result<Capabilities, ConfigError> {
        Ok(Capabilities {
            application_getter: required(&self.application_getter, "application_getter")?,
            application_updater: required(&self.application_updater, "application_updater")?,
            service_broker: required(&self.service_broker, "service_broker")?,
            container_broker: required(&self.container_broker, "container_broker")?,
            pod_spec_getter: required(&self.pod_spec_getter, "pod_spec_getter")?,
            life_getter: required(&self.life_getter, "life_getter")?,
            unit_getter: required(&self.unit_getter, "unit_getter")?,
            unit_updater: required(&self.unit_updater, "unit_updater")?,
        })
    }
}

fn required<T: ?Sized>(v: &Option<Arc<T>>, field: &'static str) -> Result<Arc<T>, ConfigError> {
    v.clone().ok_or(ConfigError::NotValid { field })
}

/// Validated capability set, shared by the root loop and every application worker.
#[derive(Clone)]
pub struct Capabilities {
    pub application_getter: Arc<dyn ApplicationGetter>,
    pub application_updater: Arc<dyn ApplicationUpdater>,
    pub service_broker: Arc<dyn ServiceBroker>,
    pub container_broker: Arc<dyn ContainerBroker>,
    pub pod_spec_getter: Arc<dyn PodSpecGetter>,
    pub life_getter: Arc<dyn LifeGetter>,
    pub unit_getter: Arc<dyn UnitGetter>,
    pub unit_updater: Arc<dyn UnitUpdater>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_names_first_missing_field() {
        let err = ProvisionerConfig::default().validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotValid {
                field: "application_getter"
            }
        );
    }

    #[test]
    fn test_bus_capacity_is_clamped() {
        let cfg = ProvisionerConfig {
            bus_capacity: 0,
            ..ProvisionerConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
