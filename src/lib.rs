//! # unitvisor
//!
//! **Unitvisor** keeps one supervised worker per live application of a
//! container-orchestrated model.
//!
//! A root loop (the [`Provisioner`]) watches application changes and, for each
//! changed name, starts an [`ApplicationWorker`], leaves it alone, or cleans up the
//! orchestrator-side service and stops the worker once the application is gone.
//! All tasks hang off a small supervision tree ([`Supervisor`]): killing a node
//! kills its children, and the first failure anywhere becomes the error the root
//! reports.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!               ApplicationGetter::watch_applications()
//!                              │ batches of names
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Provisioner (root Supervisor node)                               │
//! │  - WorkerRegistry (application name → worker)                     │
//! │  - Bus (broadcast events) ──► SubscriberSet ──► LogWriter, ...    │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ AppWorker a  │   │ AppWorker b  │   │ AppWorker c  │   (child nodes)
//!   │ unit feed    │   │ unit feed    │   │ ...          │
//!   │ pod spec feed│   │ pod spec feed│   │              │
//!   │ service feed │   │ service feed │   │              │
//!   └──────┬───────┘   └──────┬───────┘   └──────────────┘
//!          ▼                  ▼
//!     ServiceBroker / ContainerBroker / ApplicationUpdater / UnitUpdater
//! ```
//!
//! ### Lifecycle of one application
//! ```text
//! life(app) = Alive, not registered  ──► application_config ──► ApplicationWorker::start
//!                                          └─► registry.save ──► supervisor.add
//! life(app) = Dead,  not registered  ──► skip
//! life(app) = *,     registered      ──► skip
//! life(app) = NotFound               ──► unexpose_service ──► delete_service
//!                                          └─► registered?
//!                                                notify_removed (Delivered | Closed)
//!                                                stop(worker) ──► registry.delete
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                              |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------------|
//! | **Provisioning**  | Root loop and per-application convergence.                    | [`Provisioner`], [`ApplicationWorker`]          |
//! | **Supervision**   | Cascading cancellation and first-error aggregation.           | [`Supervisor`], [`Worker`]                      |
//! | **Capabilities**  | Narrow async traits for the orchestrator and model APIs.      | [`LifeGetter`], [`ContainerBroker`], ...        |
//! | **Events**        | Runtime events and pluggable subscribers.                     | [`Event`], [`Subscribe`], [`LogWriter`]         |
//! | **Errors**        | Typed errors for configuration, brokers and workers.          | [`ConfigError`], [`BrokerError`], [`WorkerError`] |
//! | **Configuration** | Mandatory capability set plus bus settings.                   | [`ProvisionerConfig`]                           |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use unitvisor::{LogWriter, Provisioner, ProvisionerConfig};
//!
//! # async fn run(config: ProvisionerConfig) -> Result<(), Box<dyn std::error::Error>> {
//! // `config` carries the broker capabilities (see `ProvisionerConfig::with_*`).
//! let config = config.with_subscribers(vec![Arc::new(LogWriter::new())]);
//!
//! let provisioner = Provisioner::start(config)?;
//! let mut events = provisioner.subscribe();
//! while let Ok(ev) = events.recv().await {
//!     if ev.is_for("app1") {
//!         break;
//!     }
//! }
//!
//! provisioner.kill();
//! provisioner.wait().await?;
//! # Ok(())
//! # }
//! ```
mod broker;
mod core;
mod error;
mod events;
mod provisioner;
mod subscribers;

// ---- Public re-exports ----

pub use broker::{
    ApplicationConfig, ApplicationGetter, ApplicationUpdater, CloudUnit, ConfigValue,
    ContainerBroker, Life, LifeGetter, MANAGED_UNITS_KEY, NotifyWatcher, PodSpecGetter,
    ProvisioningInfo, ServiceBroker, ServiceInfo, ServiceParams, Status, StringsWatcher,
    UnitGetter, UnitUpdater, UpdateApplicationService, UpdateUnits, Watcher,
};
pub use core::{Supervisor, Worker, WorkerRef, stop};
pub use error::{BrokerError, ConfigError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use provisioner::{
    ApplicationWorker, ApplicationWorkerParams, Capabilities, Provisioner, ProvisionerConfig,
    RemovalNotifier, RemovalOutcome, RemovalReceiver, RemovalSignal, WorkerRegistry,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
