//! # Provisioner and per-application workers.
//!
//! - [`Provisioner`]: root loop mapping application changes onto worker lifecycles.
//! - [`ApplicationWorker`]: converges one application onto the orchestrator.
//! - [`WorkerRegistry`]: application name → running worker.
//! - [`RemovalSignal`]: the notify-before-kill channel between the two.
//! - [`ProvisionerConfig`]: the mandatory capability set plus observability settings.

mod application;
mod config;
mod registry;
mod removal;
mod root;

pub use application::{ApplicationWorker, ApplicationWorkerParams};
pub use config::{Capabilities, ProvisionerConfig};
pub use registry::WorkerRegistry;
pub use removal::{RemovalNotifier, RemovalOutcome, RemovalReceiver, RemovalSignal};
pub use root::Provisioner;
