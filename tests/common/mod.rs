#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, broadcast, mpsc};
use unitvisor::{
    ApplicationConfig, ApplicationGetter, ApplicationUpdater, BrokerError, CloudUnit,
    ContainerBroker, Event, EventKind, Life, LifeGetter, NotifyWatcher, PodSpecGetter,
    ProvisionerConfig, ProvisioningInfo, ServiceBroker, ServiceInfo, ServiceParams,
    StringsWatcher, UnitGetter, UnitUpdater, UpdateApplicationService, UpdateUnits,
};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// One recorded broker call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    WatchApplications,
    ApplicationConfig(String),
    Life(String),
    UnexposeService(String),
    DeleteService(String),
    EnsureService(String, ServiceParams),
    Service(String),
    WatchService(String),
    Units(String),
    WatchCloudUnits(String),
    ProvisioningInfo(String),
    WatchPodSpec(String),
    WatchUnits(String),
    UpdateApplicationService(UpdateApplicationService),
    UpdateUnits(UpdateUnits),
}

impl Call {
    /// The application (or unit) the call was about.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Call::WatchApplications => None,
            Call::ApplicationConfig(a)
            | Call::Life(a)
            | Call::UnexposeService(a)
            | Call::DeleteService(a)
            | Call::EnsureService(a, _)
            | Call::Service(a)
            | Call::WatchService(a)
            | Call::Units(a)
            | Call::WatchCloudUnits(a)
            | Call::ProvisioningInfo(a)
            | Call::WatchPodSpec(a)
            | Call::WatchUnits(a) => Some(a.as_str()),
            Call::UpdateApplicationService(u) => Some(u.application.as_str()),
            Call::UpdateUnits(u) => Some(u.application.as_str()),
        }
    }
}

/// In-memory stand-in for every broker capability.
///
/// Entities without a recorded Life are `NotFound`. Every watcher hands its
/// sender to the test through the `*_feed` accessors.
pub struct FakeBroker {
    calls: Mutex<Vec<Call>>,
    lives: Mutex<HashMap<String, Life>>,
    configs: Mutex<HashMap<String, ApplicationConfig>>,
    pod_specs: Mutex<HashMap<String, String>>,
    services: Mutex<HashMap<String, ServiceInfo>>,
    cloud_units: Mutex<HashMap<String, Vec<CloudUnit>>>,
    failures: Mutex<HashMap<&'static str, BrokerError>>,
    gates: Mutex<HashMap<&'static str, Arc<Semaphore>>>,

    apps_tx: Mutex<Option<mpsc::Sender<Vec<String>>>>,
    apps_rx: Mutex<Option<mpsc::Receiver<Vec<String>>>>,
    unit_feeds: Mutex<HashMap<String, mpsc::Sender<Vec<String>>>>,
    pod_spec_feeds: Mutex<HashMap<String, mpsc::Sender<()>>>,
    service_feeds: Mutex<HashMap<String, mpsc::Sender<()>>>,
    cloud_unit_feeds: Mutex<HashMap<String, mpsc::Sender<()>>>,
}

impl FakeBroker {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::channel(16);
        Arc::new(Self {
            calls: Mutex::default(),
            lives: Mutex::default(),
            configs: Mutex::default(),
            pod_specs: Mutex::default(),
            services: Mutex::default(),
            cloud_units: Mutex::default(),
            failures: Mutex::default(),
            gates: Mutex::default(),
            apps_tx: Mutex::new(Some(tx)),
            apps_rx: Mutex::new(Some(rx)),
            unit_feeds: Mutex::default(),
            pod_spec_feeds: Mutex::default(),
            service_feeds: Mutex::default(),
            cloud_unit_feeds: Mutex::default(),
        })
    }

    pub fn set_life(&self, entity: &str, life: Life) {
        self.lives.lock().unwrap().insert(entity.to_string(), life);
    }

    /// Makes `entity` `NotFound`.
    pub fn remove(&self, entity: &str) {
        self.lives.lock().unwrap().remove(entity);
    }

    pub fn set_config(&self, application: &str, config: ApplicationConfig) {
        self.configs.lock().unwrap().insert(application.to_string(), config);
    }

    pub fn set_pod_spec(&self, application: &str, spec: &str) {
        self.pod_specs
            .lock()
            .unwrap()
            .insert(application.to_string(), spec.to_string());
    }

    pub fn set_service(&self, application: &str, service: ServiceInfo) {
        self.services.lock().unwrap().insert(application.to_string(), service);
    }

    pub fn set_cloud_units(&self, application: &str, units: Vec<CloudUnit>) {
        self.cloud_units.lock().unwrap().insert(application.to_string(), units);
    }

    /// Makes every later call of `op` fail with `err`.
    pub fn fail(&self, op: &'static str, err: BrokerError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    /// Parks every later call of `op` after it is recorded, until [`release`](Self::release).
    pub fn hold(&self, op: &'static str) {
        self.gates.lock().unwrap().insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Lets held and later calls of `op` through.
    pub fn release(&self, op: &'static str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(op) {
            gate.close();
        }
    }

    async fn gate(&self, op: &'static str) {
        let gate = self.gates.lock().unwrap().get(op).cloned();
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls about `subject`, in order.
    pub fn calls_for(&self, subject: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.subject() == Some(subject))
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Delivers one batch of changed application names.
    pub async fn send_apps(&self, names: &[&str]) {
        let tx = self.apps_tx.lock().unwrap().clone().expect("application feed open");
        let batch = names.iter().map(|n| n.to_string()).collect();
        tx.send(batch).await.expect("provisioner reads the application feed");
    }

    /// Closes the application feed.
    pub fn close_apps(&self) {
        self.apps_tx.lock().unwrap().take();
    }

    pub async fn unit_feed(&self, application: &str) -> mpsc::Sender<Vec<String>> {
        feed(&self.unit_feeds, application).await
    }

    pub async fn pod_spec_feed(&self, application: &str) -> mpsc::Sender<()> {
        feed(&self.pod_spec_feeds, application).await
    }

    pub async fn service_feed(&self, application: &str) -> mpsc::Sender<()> {
        feed(&self.service_feeds, application).await
    }

    pub async fn cloud_unit_feed(&self, application: &str) -> mpsc::Sender<()> {
        feed(&self.cloud_unit_feeds, application).await
    }

    /// Drops the pod spec feed of `application`, closing its channel.
    pub fn close_pod_spec_feed(&self, application: &str) {
        self.pod_spec_feeds.lock().unwrap().remove(application);
    }

    fn record(&self, op: &'static str, call: Call) -> Result<(), BrokerError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Waits until a worker has subscribed to the feed, then returns its sender.
async fn feed<T>(
    feeds: &Mutex<HashMap<String, mpsc::Sender<T>>>,
    application: &str,
) -> mpsc::Sender<T> {
    bounded(async {
        loop {
            if let Some(tx) = feeds.lock().unwrap().get(application) {
                return tx.clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

fn notify_watcher(
    feeds: &Mutex<HashMap<String, mpsc::Sender<()>>>,
    name: &'static str,
    application: &str,
) -> NotifyWatcher {
    let (tx, rx) = mpsc::channel(16);
    feeds.lock().unwrap().insert(application.to_string(), tx);
    NotifyWatcher::from_receiver(name, rx)
}

#[async_trait]
impl ApplicationGetter for FakeBroker {
    async fn watch_applications(&self) -> Result<StringsWatcher, BrokerError> {
        self.record("watch_applications", Call::WatchApplications)?;
        let rx = self
            .apps_rx
            .lock()
            .unwrap()
            .take()
            .expect("application feed watched once");
        Ok(StringsWatcher::from_receiver("applications", rx))
    }

    async fn application_config(
        &self,
        application: &str,
    ) -> Result<ApplicationConfig, BrokerError> {
        self.record("application_config", Call::ApplicationConfig(application.to_string()))?;
        Ok(self
            .configs
            .lock()
            .unwrap()
            .get(application)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ApplicationUpdater for FakeBroker {
    async fn update_application_service(
        &self,
        update: UpdateApplicationService,
    ) -> Result<(), BrokerError> {
        self.record("update_application_service", Call::UpdateApplicationService(update))
    }
}

#[async_trait]
impl ServiceBroker for FakeBroker {
    async fn ensure_service(
        &self,
        application: &str,
        params: ServiceParams,
    ) -> Result<(), BrokerError> {
        self.record("ensure_service", Call::EnsureService(application.to_string(), params))
    }

    async fn service(&self, application: &str) -> Result<ServiceInfo, BrokerError> {
        self.record("service", Call::Service(application.to_string()))?;
        self.services
            .lock()
            .unwrap()
            .get(application)
            .cloned()
            .ok_or_else(|| BrokerError::not_found(application))
    }

    async fn watch_service(&self, application: &str) -> Result<NotifyWatcher, BrokerError> {
        self.record("watch_service", Call::WatchService(application.to_string()))?;
        Ok(notify_watcher(&self.service_feeds, "service", application))
    }
}

#[async_trait]
impl ContainerBroker for FakeBroker {
    async fn unexpose_service(&self, application: &str) -> Result<(), BrokerError> {
        self.record("unexpose_service", Call::UnexposeService(application.to_string()))
    }

    async fn delete_service(&self, application: &str) -> Result<(), BrokerError> {
        self.record("delete_service", Call::DeleteService(application.to_string()))
    }

    async fn units(&self, application: &str) -> Result<Vec<CloudUnit>, BrokerError> {
        self.record("units", Call::Units(application.to_string()))?;
        Ok(self
            .cloud_units
            .lock()
            .unwrap()
            .get(application)
            .cloned()
            .unwrap_or_default())
    }

    async fn watch_units(&self, application: &str) -> Result<NotifyWatcher, BrokerError> {
        self.record("watch_cloud_units", Call::WatchCloudUnits(application.to_string()))?;
        Ok(notify_watcher(&self.cloud_unit_feeds, "cloud-units", application))
    }
}

#[async_trait]
impl PodSpecGetter for FakeBroker {
    async fn provisioning_info(
        &self,
        application: &str,
    ) -> Result<ProvisioningInfo, BrokerError> {
        let call = Call::ProvisioningInfo(application.to_string());
        let recorded = self.record("provisioning_info", call);
        self.gate("provisioning_info").await;
        recorded?;
        let pod_spec = self
            .pod_specs
            .lock()
            .unwrap()
            .get(application)
            .cloned()
            .unwrap_or_default();
        Ok(ProvisioningInfo { pod_spec })
    }

    async fn watch_pod_spec(&self, application: &str) -> Result<NotifyWatcher, BrokerError> {
        self.record("watch_pod_spec", Call::WatchPodSpec(application.to_string()))?;
        Ok(notify_watcher(&self.pod_spec_feeds, "pod-spec", application))
    }
}

#[async_trait]
impl LifeGetter for FakeBroker {
    async fn life(&self, entity: &str) -> Result<Life, BrokerError> {
        self.record("life", Call::Life(entity.to_string()))?;
        self.lives
            .lock()
            .unwrap()
            .get(entity)
            .copied()
            .ok_or_else(|| BrokerError::not_found(entity))
    }
}

#[async_trait]
impl UnitGetter for FakeBroker {
    async fn watch_units(&self, application: &str) -> Result<StringsWatcher, BrokerError> {
        self.record("watch_units", Call::WatchUnits(application.to_string()))?;
        let (tx, rx) = mpsc::channel(16);
        self.unit_feeds
            .lock()
            .unwrap()
            .insert(application.to_string(), tx);
        Ok(StringsWatcher::from_receiver("units", rx))
    }
}

#[async_trait]
impl UnitUpdater for FakeBroker {
    async fn update_units(&self, update: UpdateUnits) -> Result<(), BrokerError> {
        self.record("update_units", Call::UpdateUnits(update))
    }
}

/// A configuration with every capability served by `broker`.
pub fn config(broker: &Arc<FakeBroker>) -> ProvisionerConfig {
    ProvisionerConfig::default()
        .with_application_getter(broker.clone())
        .with_application_updater(broker.clone())
        .with_service_broker(broker.clone())
        .with_container_broker(broker.clone())
        .with_pod_spec_getter(broker.clone())
        .with_life_getter(broker.clone())
        .with_unit_getter(broker.clone())
        .with_unit_updater(broker.clone())
}

/// Fails the test instead of hanging on a deadlock.
pub async fn bounded<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(TIMEOUT, fut)
        .await
        .expect("operation timed out")
}

/// Receives events until one of `kind` about `application` arrives.
pub async fn wait_for(
    events: &mut broadcast::Receiver<Event>,
    kind: EventKind,
    application: &str,
) -> Event {
    bounded(async {
        loop {
            match events.recv().await {
                Ok(ev) if ev.kind == kind && ev.is_for(application) => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
}
