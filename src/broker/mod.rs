//! Capabilities consumed by the provisioner and its application workers.
//!
//! Each collaborator is a narrow async trait so the core depends on behaviour,
//! not on a concrete orchestrator client, and tests can substitute doubles.
//!
//! | Capability               | Used by                  | Operations                                         |
//! |--------------------------|--------------------------|----------------------------------------------------|
//! | [`ApplicationGetter`]    | provisioner              | `watch_applications`, `application_config`         |
//! | [`LifeGetter`]           | provisioner, app worker  | `life` (applications and units)                    |
//! | [`ContainerBroker`]      | provisioner, app worker  | `unexpose_service`, `delete_service`, unit feed    |
//! | [`ServiceBroker`]        | app worker               | `ensure_service`, `service`, service feed          |
//! | [`PodSpecGetter`]        | app worker               | `watch_pod_spec`, `provisioning_info`              |
//! | [`ApplicationUpdater`]   | app worker               | `update_application_service`                       |
//! | [`UnitGetter`]           | app worker               | `watch_units`                                      |
//! | [`UnitUpdater`]          | app worker               | `update_units`                                     |

mod types;
mod watcher;

pub use types::{
    ApplicationConfig, CloudUnit, ConfigValue, Life, MANAGED_UNITS_KEY, ProvisioningInfo,
    ServiceInfo, ServiceParams, Status, UpdateApplicationService, UpdateUnits,
};
pub use watcher::{NotifyWatcher, StringsWatcher, Watcher};

use async_trait::async_trait;

use crate::error::BrokerError;

/// Upstream application records.
#[async_trait]
pub trait ApplicationGetter: Send + Sync + 'static {
    /// Subscribes to batches of changed application names.
    async fn watch_applications(&self) -> Result<StringsWatcher, BrokerError>;

    /// Returns the options of `application`.
    async fn application_config(
        &self,
        application: &str,
    ) -> Result<ApplicationConfig, BrokerError>;
}

/// Application status writes.
#[async_trait]
pub trait ApplicationUpdater: Send + Sync + 'static {
    async fn update_application_service(
        &self,
        update: UpdateApplicationService,
    ) -> Result<(), BrokerError>;
}

/// Orchestrator service objects of an application.
#[async_trait]
pub trait ServiceBroker: Send + Sync + 'static {
    /// Creates or updates the service and its pods to match `params`.
    async fn ensure_service(
        &self,
        application: &str,
        params: ServiceParams,
    ) -> Result<(), BrokerError>;

    /// Returns the current service state.
    async fn service(&self, application: &str) -> Result<ServiceInfo, BrokerError>;

    /// Subscribes to changes of the service state.
    async fn watch_service(&self, application: &str) -> Result<NotifyWatcher, BrokerError>;
}

/// Orchestrator-side objects that outlive the application record.
#[async_trait]
pub trait ContainerBroker: Send + Sync + 'static {
    /// Removes any external exposure of the application's service.
    async fn unexpose_service(&self, application: &str) -> Result<(), BrokerError>;

    /// Deletes the application's service and its workload objects.
    async fn delete_service(&self, application: &str) -> Result<(), BrokerError>;

    /// Returns the orchestrator's view of the application's units.
    async fn units(&self, application: &str) -> Result<Vec<CloudUnit>, BrokerError>;

    /// Subscribes to changes of the orchestrator's units.
    async fn watch_units(&self, application: &str) -> Result<NotifyWatcher, BrokerError>;
}

/// Pod specifications.
#[async_trait]
pub trait PodSpecGetter: Send + Sync + 'static {
    async fn provisioning_info(&self, application: &str) -> Result<ProvisioningInfo, BrokerError>;

    async fn watch_pod_spec(&self, application: &str) -> Result<NotifyWatcher, BrokerError>;
}

/// Lifecycle queries for applications and units.
#[async_trait]
pub trait LifeGetter: Send + Sync + 'static {
    /// Returns the Life of the named entity, or [`BrokerError::NotFound`] once it is gone.
    async fn life(&self, entity: &str) -> Result<Life, BrokerError>;
}

/// Upstream unit records.
#[async_trait]
pub trait UnitGetter: Send + Sync + 'static {
    /// Subscribes to batches of changed unit names of `application`.
    async fn watch_units(&self, application: &str) -> Result<StringsWatcher, BrokerError>;
}

/// Unit status writes.
#[async_trait]
pub trait UnitUpdater: Send + Sync + 'static {
    async fn update_units(&self, update: UpdateUnits) -> Result<(), BrokerError>;
}
