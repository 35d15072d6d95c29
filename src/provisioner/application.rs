//! # ApplicationWorker: converges one application onto the orchestrator.
//!
//! One worker runs per live application, as a supervised child of the provisioner.
//! It owns its own [`Supervisor`] node; the four change feeds it consumes are
//! attached to that node, so a failing feed is fatal to the worker and dies with it.
//!
//! ## Architecture
//! ```text
//! ApplicationWorker::start(params)
//!   └─► Supervisor::invoke(app, converge)
//!         ├─► add(UnitGetter::watch_units)        unit ids      → life() per unit
//!         ├─► add(PodSpecGetter::watch_pod_spec)  spec changed  → provisioning_info()
//!         ├─► add(ServiceBroker::watch_service)   svc changed   → update_application_service()
//!         ├─► add(ContainerBroker::watch_units)   pods changed  → update_units()
//!         └─► loop select (biased):
//!               removal.recv()  → ApplicationRemoved, return Ok
//!               node.dying()    → return Ok
//!               feed change     → converge step (broker error ⇒ fatal)
//! ```
//!
//! ## Rules
//! - `ensure_service` is called only once a pod spec is known, and only when the
//!   spec or the alive-unit count differs from what was last ensured.
//! - After the removal notice nothing is written upstream.
//! - A closed feed is [`WorkerError::WatcherClosed`].

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::broker::{Life, ServiceParams, UpdateApplicationService, UpdateUnits};
use crate::core::{Supervisor, Worker, WorkerRef};
use crate::error::{BrokerError, WorkerError};
use crate::events::{Bus, Event, EventKind};
use crate::provisioner::config::Capabilities;
use crate::provisioner::removal::{RemovalNotifier, RemovalOutcome, RemovalReceiver, RemovalSignal};

/// Everything a worker is constructed with.
pub struct ApplicationWorkerParams {
    /// Application name.
    pub application: String,
    /// Fresh removal channel; the worker keeps the receiving half.
    pub removal: RemovalSignal,
    /// Whether units are managed by the orchestrator rather than upstream.
    pub managed_units: bool,
    pub capabilities: Capabilities,
    pub bus: Bus,
}

/// Handle to a running application worker.
pub struct ApplicationWorker {
    application: String,
    managed_units: bool,
    supervisor: Arc<Supervisor>,
    removal: Mutex<Option<RemovalNotifier>>,
}

impl ApplicationWorker {
    /// Starts the worker's convergence loop and returns its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(params: ApplicationWorkerParams) -> Arc<Self> {
        let ApplicationWorkerParams {
            application,
            removal,
            managed_units,
            capabilities,
            bus,
        } = params;
        let (notifier, receiver) = removal.split();

        let convergence = Convergence {
            application: application.clone(),
            managed_units,
            caps: capabilities,
            bus,
            alive_units: BTreeSet::new(),
            pod_spec: None,
            ensured: None,
        };
        let supervisor = Supervisor::invoke(application.clone(), move |node| {
            convergence.run(node, receiver)
        });

        Arc::new(Self {
            application,
            managed_units,
            supervisor,
            removal: Mutex::new(Some(notifier)),
        })
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn managed_units(&self) -> bool {
        self.managed_units
    }

    /// True once the worker has started shutting down.
    pub fn is_dying(&self) -> bool {
        self.supervisor.is_dying()
    }

    /// True once the worker and its feeds have exited.
    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Tells the worker its application was deleted upstream.
    ///
    /// Never blocks on a worker that is already dying. Only the first call can
    /// deliver; later calls report [`RemovalOutcome::Closed`].
    pub async fn notify_removed(&self) -> RemovalOutcome {
        let notifier = self
            .removal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match notifier {
            Some(notifier) => notifier.notify(self.supervisor.dying()).await,
            None => RemovalOutcome::Closed,
        }
    }
}

#[async_trait]
impl Worker for ApplicationWorker {
    fn name(&self) -> &str {
        &self.application
    }

    fn kill(&self) {
        self.supervisor.kill(None);
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.supervisor.wait().await
    }
}

/// State of the convergence loop; lives inside the worker's task.
struct Convergence {
    application: String,
    managed_units: bool,
    caps: Capabilities,
    bus: Bus,
    /// Units whose last observed Life was Alive.
    alive_units: BTreeSet<String>,
    /// Latest non-empty pod spec.
    pod_spec: Option<String>,
    /// Spec and unit count of the last successful `ensure_service`.
    ensured: Option<(String, usize)>,
}

impl Convergence {
    async fn run(
        mut self,
        node: Arc<Supervisor>,
        mut removal: RemovalReceiver,
    ) -> Result<(), WorkerError> {
        let app = self.application.clone();

        let (units, w) = self
            .caps
            .unit_getter
            .watch_units(&app)
            .await
            .map_err(|e| WorkerError::broker(format!("watching units of {app:?}"), e))?
            .into_parts();
        let mut units = attach(&node, units, w).await?;

        let (specs, w) = self
            .caps
            .pod_spec_getter
            .watch_pod_spec(&app)
            .await
            .map_err(|e| WorkerError::broker(format!("watching pod spec of {app:?}"), e))?
            .into_parts();
        let mut specs = attach(&node, specs, w).await?;

        let (services, w) = self
            .caps
            .service_broker
            .watch_service(&app)
            .await
            .map_err(|e| WorkerError::broker(format!("watching service of {app:?}"), e))?
            .into_parts();
        let mut services = attach(&node, services, w).await?;

        let (cloud_units, w) = self
            .caps
            .container_broker
            .watch_units(&app)
            .await
            .map_err(|e| WorkerError::broker(format!("watching cloud units of {app:?}"), e))?
            .into_parts();
        let mut cloud_units = attach(&node, cloud_units, w).await?;

        loop {
            tokio::select! {
                biased;

                _ = removal.recv() => {
                    self.bus.publish(
                        Event::new(EventKind::ApplicationRemoved).with_application(app.as_str()),
                    );
                    return Ok(());
                }
                _ = node.dying() => return Ok(()),

                changed = units.recv() => {
                    let changed = changed.ok_or(WorkerError::WatcherClosed)?;
                    self.units_changed(changed).await?;
                }
                changed = specs.recv() => {
                    changed.ok_or(WorkerError::WatcherClosed)?;
                    self.pod_spec_changed().await?;
                }
                changed = services.recv() => {
                    changed.ok_or(WorkerError::WatcherClosed)?;
                    self.service_changed().await?;
                }
                changed = cloud_units.recv() => {
                    changed.ok_or(WorkerError::WatcherClosed)?;
                    self.cloud_units_changed().await?;
                }
            }
        }
    }

    async fn units_changed(&mut self, units: Vec<String>) -> Result<(), WorkerError> {
        for unit in units {
            match self.caps.life_getter.life(&unit).await {
                Ok(Life::Alive) => {
                    self.alive_units.insert(unit);
                }
                Ok(Life::Dying | Life::Dead) | Err(BrokerError::NotFound(_)) => {
                    self.alive_units.remove(&unit);
                }
                Err(e) => {
                    return Err(WorkerError::broker(format!("getting life of unit {unit:?}"), e));
                }
            }
        }
        self.ensure_service().await
    }

    async fn pod_spec_changed(&mut self) -> Result<(), WorkerError> {
        let info = self
            .caps
            .pod_spec_getter
            .provisioning_info(&self.application)
            .await
            .map_err(|e| {
                WorkerError::broker(format!("getting pod spec of {:?}", self.application), e)
            })?;
        self.pod_spec = Some(info.pod_spec).filter(|spec| !spec.is_empty());
        self.ensure_service().await
    }

    async fn ensure_service(&mut self) -> Result<(), WorkerError> {
        let Some(spec) = self.pod_spec.clone() else {
            return Ok(());
        };
        let desired = (spec, self.alive_units.len());
        if self.ensured.as_ref() == Some(&desired) {
            return Ok(());
        }

        let params = ServiceParams {
            pod_spec: desired.0.clone(),
            num_units: desired.1,
            managed_units: self.managed_units,
        };
        self.caps
            .service_broker
            .ensure_service(&self.application, params)
            .await
            .map_err(|e| {
                WorkerError::broker(format!("ensuring service of {:?}", self.application), e)
            })?;

        self.bus.publish(
            Event::new(EventKind::ServiceEnsured)
                .with_application(self.application.as_str())
                .with_units(desired.1),
        );
        self.ensured = Some(desired);
        Ok(())
    }

    async fn service_changed(&mut self) -> Result<(), WorkerError> {
        let service = match self.caps.service_broker.service(&self.application).await {
            Ok(service) => service,
            // not created yet
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => {
                return Err(WorkerError::broker(
                    format!("getting service of {:?}", self.application),
                    e,
                ));
            }
        };

        let status = service.status.status.clone();
        self.caps
            .application_updater
            .update_application_service(UpdateApplicationService {
                application: self.application.clone(),
                provider_id: service.id,
                addresses: service.addresses,
                status: service.status,
            })
            .await
            .map_err(|e| {
                WorkerError::broker(format!("updating application {:?}", self.application), e)
            })?;

        self.bus.publish(
            Event::new(EventKind::ApplicationServiceUpdated)
                .with_application(self.application.as_str())
                .with_reason(status),
        );
        Ok(())
    }

    async fn cloud_units_changed(&mut self) -> Result<(), WorkerError> {
        let units = self
            .caps
            .container_broker
            .units(&self.application)
            .await
            .map_err(|e| {
                WorkerError::broker(format!("getting cloud units of {:?}", self.application), e)
            })?;

        let count = units.len();
        self.caps
            .unit_updater
            .update_units(UpdateUnits {
                application: self.application.clone(),
                units,
            })
            .await
            .map_err(|e| {
                WorkerError::broker(format!("updating units of {:?}", self.application), e)
            })?;

        self.bus.publish(
            Event::new(EventKind::UnitsUpdated)
                .with_application(self.application.as_str())
                .with_units(count),
        );
        Ok(())
    }
}

/// Attaches a feed's worker to `node` and hands back its channel.
async fn attach<T>(
    node: &Arc<Supervisor>,
    changes: mpsc::Receiver<T>,
    worker: WorkerRef,
) -> Result<mpsc::Receiver<T>, WorkerError> {
    node.add(worker).await?;
    Ok(changes)
}
