//! # Provisioner: the root reconciliation loop.
//!
//! Watches application changes and keeps exactly one [`ApplicationWorker`] per
//! live application. Every worker is a supervised child of the provisioner's
//! [`Supervisor`] node, so a failing worker is fatal to the provisioner and
//! killing the provisioner stops every worker.
//!
//! ## Architecture
//! ```text
//! Provisioner::start(config)
//!   ├─► config.capabilities()              (missing field ⇒ ConfigError, nothing started)
//!   ├─► Bus + SubscriberSet + forwarder
//!   └─► Supervisor::invoke("provisioner", Dispatcher::run)
//!         ├─► add(watch_applications)
//!         └─► loop select:
//!               dying          → return
//!               batch closed   → WatcherClosed
//!               batch(names)   → for name in names: dispatch(name)
//!
//! dispatch(name):
//!   life(name)
//!     ├─ NotFound  → unexpose_service → delete_service
//!     │              └─ registered? notify_removed → stop → registry.delete
//!     ├─ Err(e)    → fatal
//!     ├─ registered or Dead → skip
//!     └─ otherwise → application_config → ApplicationWorker::start → save → add
//! ```
//!
//! ## Rules
//! - Names of a batch are handled one at a time, in order; only the loop
//!   mutates the registry.
//! - Cleanup runs for every `NotFound`, whether or not a worker was ever started.
//! - A worker that fails to stop is still deregistered; the failure is published
//!   as [`EventKind::WorkerStopFailed`] in place of [`EventKind::WorkerStopped`].
//!   The root itself then ends with that worker's error, which already travelled
//!   up the supervision tree.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::broker::{Life, MANAGED_UNITS_KEY};
use crate::core::{Supervisor, Worker, WorkerRef, stop};
use crate::error::{ConfigError, WorkerError};
use crate::events::{Bus, Event, EventKind};
use crate::provisioner::application::{ApplicationWorker, ApplicationWorkerParams};
use crate::provisioner::config::{Capabilities, ProvisionerConfig};
use crate::provisioner::registry::WorkerRegistry;
use crate::provisioner::removal::{RemovalOutcome, RemovalSignal};
use crate::subscribers::SubscriberSet;

/// Handle to a running provisioner.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use unitvisor::{LogWriter, Provisioner, ProvisionerConfig};
///
/// # async fn run(config: ProvisionerConfig) -> Result<(), Box<dyn std::error::Error>> {
/// let config = config.with_subscribers(vec![Arc::new(LogWriter::new())]);
/// let provisioner = Provisioner::start(config)?;
///
/// // ... later, on shutdown:
/// provisioner.kill();
/// provisioner.wait().await?;
/// # Ok(())
/// # }
/// ```
pub struct Provisioner {
    supervisor: Arc<Supervisor>,
    registry: Arc<WorkerRegistry>,
    bus: Bus,
}

impl Provisioner {
    /// Validates `config` and starts the root loop.
    ///
    /// Fails with [`ConfigError::NotValid`] naming the first missing capability;
    /// nothing is spawned in that case. Must be called from within a tokio runtime.
    pub fn start(config: ProvisionerConfig) -> Result<Arc<Self>, ConfigError> {
        let caps = config.capabilities()?;
        let bus = Bus::new(config.bus_capacity_clamped());
        let registry = Arc::new(WorkerRegistry::new());

        let subscribers = SubscriberSet::new(config.subscribers, bus.clone());
        tokio::spawn(forward(bus.subscribe(), subscribers));

        let dispatcher = Dispatcher {
            caps,
            registry: Arc::clone(&registry),
            bus: bus.clone(),
        };
        let supervisor = Supervisor::invoke("provisioner", move |node| dispatcher.run(node));

        let stopped = Arc::clone(&supervisor);
        let stopped_bus = bus.clone();
        tokio::spawn(async move {
            let ev = match stopped.wait().await {
                Ok(()) => Event::new(EventKind::ProvisionerStopped),
                Err(e) => Event::new(EventKind::ProvisionerStopped).with_reason(e.to_string()),
            };
            stopped_bus.publish(ev);
        });

        Ok(Arc::new(Self {
            supervisor,
            registry,
            bus,
        }))
    }

    /// Requests cooperative shutdown of the loop and every worker. Idempotent.
    pub fn kill(&self) {
        self.supervisor.kill(None);
    }

    /// Blocks until the loop and every worker have finished; returns the first fatal error.
    pub async fn wait(&self) -> Result<(), WorkerError> {
        self.supervisor.wait().await
    }

    /// True once shutdown has started.
    pub fn is_dying(&self) -> bool {
        self.supervisor.is_dying()
    }

    /// Subscribes to runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Returns the worker currently registered for `application`.
    pub async fn application_worker(&self, application: &str) -> Option<Arc<ApplicationWorker>> {
        self.registry.get(application).await
    }

    /// Returns the sorted names of applications with a registered worker.
    pub async fn applications(&self) -> Vec<String> {
        self.registry.list().await
    }
}

#[async_trait]
impl Worker for Provisioner {
    fn name(&self) -> &str {
        self.supervisor.name()
    }

    fn kill(&self) {
        Provisioner::kill(self);
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        Provisioner::wait(self).await
    }
}

/// Feeds bus events to the subscribers until the provisioner has stopped.
async fn forward(mut events: broadcast::Receiver<Event>, subscribers: SubscriberSet) {
    loop {
        match events.recv().await {
            Ok(ev) => {
                let last = ev.kind == EventKind::ProvisionerStopped;
                subscribers.emit(&ev);
                if last {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    subscribers.shutdown().await;
}

/// The loop body; owned by the provisioner's supervisor task.
struct Dispatcher {
    caps: Capabilities,
    registry: Arc<WorkerRegistry>,
    bus: Bus,
}

impl Dispatcher {
    async fn run(self, node: Arc<Supervisor>) -> Result<(), WorkerError> {
        let (mut changes, watcher) = self
            .caps
            .application_getter
            .watch_applications()
            .await
            .map_err(|e| WorkerError::broker("watching applications", e))?
            .into_parts();
        node.add(watcher).await?;

        loop {
            tokio::select! {
                _ = node.dying() => return Ok(()),
                batch = changes.recv() => {
                    let batch = batch.ok_or(WorkerError::WatcherClosed)?;
                    for application in batch {
                        self.dispatch(&node, &application).await?;
                    }
                }
            }
        }
    }

    async fn dispatch(&self, node: &Arc<Supervisor>, app: &str) -> Result<(), WorkerError> {
        let life = match self.caps.life_getter.life(app).await {
            Ok(life) => life,
            Err(e) if e.is_not_found() => return self.remove(app).await,
            Err(e) => {
                return Err(WorkerError::broker(format!("getting life of {app:?}"), e));
            }
        };

        if self.registry.contains(app).await {
            self.skip(app, "registered");
            return Ok(());
        }
        if life == Life::Dead {
            self.skip(app, "dead");
            return Ok(());
        }
        self.start_worker(node, app).await
    }

    async fn remove(&self, app: &str) -> Result<(), WorkerError> {
        let broker = &self.caps.container_broker;

        broker
            .unexpose_service(app)
            .await
            .map_err(|e| WorkerError::broker(format!("unexposing service {app:?}"), e))?;
        self.publish(EventKind::ServiceUnexposed, app);

        broker
            .delete_service(app)
            .await
            .map_err(|e| WorkerError::broker(format!("deleting service {app:?}"), e))?;
        self.publish(EventKind::ServiceDeleted, app);

        let Some(worker) = self.registry.get(app).await else {
            return Ok(());
        };

        match worker.notify_removed().await {
            RemovalOutcome::Delivered => self.publish(EventKind::RemovalDelivered, app),
            RemovalOutcome::Closed => self.publish(EventKind::RemovalClosed, app),
        }

        let stopped = stop(worker.as_ref()).await;
        self.registry.delete(app).await;
        match stopped {
            Ok(()) => self.publish(EventKind::WorkerStopped, app),
            Err(e) => self.bus.publish(
                Event::new(EventKind::WorkerStopFailed)
                    .with_application(app)
                    .with_reason(e.to_string()),
            ),
        }
        Ok(())
    }

    async fn start_worker(&self, node: &Arc<Supervisor>, app: &str) -> Result<(), WorkerError> {
        let config = self
            .caps
            .application_getter
            .application_config(app)
            .await
            .map_err(|e| WorkerError::broker(format!("getting config of {app:?}"), e))?;
        let managed_units = config.get_bool(MANAGED_UNITS_KEY, false);

        let worker = ApplicationWorker::start(ApplicationWorkerParams {
            application: app.to_string(),
            removal: RemovalSignal::new(),
            managed_units,
            capabilities: self.caps.clone(),
            bus: self.bus.clone(),
        });
        self.registry.save(app, Arc::clone(&worker)).await;
        node.add(worker as WorkerRef).await?;

        let mut ev = Event::new(EventKind::WorkerStarted).with_application(app);
        if managed_units {
            ev = ev.with_reason("managed-units");
        }
        self.bus.publish(ev);
        Ok(())
    }

    fn skip(&self, app: &str, reason: &'static str) {
        self.bus.publish(
            Event::new(EventKind::ApplicationSkipped)
                .with_application(app)
                .with_reason(reason),
        );
    }

    fn publish(&self, kind: EventKind, app: &str) {
        self.bus.publish(Event::new(kind).with_application(app));
    }
}
