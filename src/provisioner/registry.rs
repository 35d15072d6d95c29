//! # Worker registry: application name → running application worker.
//!
//! ## Rules
//! - At most one worker per application name.
//! - An entry exists iff a worker is running for the name (or is being stopped).
//! - Only the root loop mutates it; anyone may read it.
//! - The lock is held only for the map operation itself, never across a broker
//!   call, a channel operation or a worker stop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::provisioner::application::ApplicationWorker;

/// Name-keyed registry of application workers.
pub struct WorkerRegistry<W = ApplicationWorker> {
    workers: RwLock<HashMap<String, Arc<W>>>,
}

impl<W> Default for WorkerRegistry<W> {
    fn default() -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
        }
    }
}

impl<W> WorkerRegistry<W> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `worker` under `application`, returning any worker it replaced.
    pub async fn save(&self, application: &str, worker: Arc<W>) -> Option<Arc<W>> {
        self.workers
            .write()
            .await
            .insert(application.to_string(), worker)
    }

    /// Returns the worker registered under `application`.
    pub async fn get(&self, application: &str) -> Option<Arc<W>> {
        self.workers.read().await.get(application).cloned()
    }

    /// True if a worker is registered under `application`.
    pub async fn contains(&self, application: &str) -> bool {
        self.workers.read().await.contains_key(application)
    }

    /// Removes and returns the worker registered under `application`.
    pub async fn delete(&self, application: &str) -> Option<Arc<W>> {
        self.workers.write().await.remove(application)
    }

    /// Returns sorted list of registered application names.
    pub async fn list(&self) -> Vec<String> {
        let workers = self.workers.read().await;
        let mut names: Vec<String> = workers.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub async fn len(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.read().await.is_empty()
    }
}
