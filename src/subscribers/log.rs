//! # LogWriter: renders events through `tracing`.
//!
//! Dispatch and convergence events are logged at `info`/`debug`, the removal
//! handshake at `info`/`warn`, and failures at `error`. Install any
//! `tracing` subscriber in the host process to see the output.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO unitvisor: worker started application="app1" managed_units=false
//! INFO unitvisor: service unexposed application="app1"
//! INFO unitvisor: service deleted application="app1"
//! WARN unitvisor: removal channel closed, worker already dying application="app1"
//! ERROR unitvisor: stopping application worker failed application="app1" error="..."
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Writes every event as a `tracing` record under the `unitvisor` target.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Same as `LogWriter::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let application = e.application.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ApplicationSkipped => {
                debug!(target: "unitvisor", application, reason, "application skipped");
            }
            EventKind::ServiceUnexposed => {
                info!(target: "unitvisor", application, "service unexposed");
            }
            EventKind::ServiceDeleted => {
                info!(target: "unitvisor", application, "service deleted");
            }
            EventKind::WorkerStarted => {
                let managed_units = reason == "managed-units";
                info!(target: "unitvisor", application, managed_units, "worker started");
            }
            EventKind::RemovalDelivered => {
                info!(target: "unitvisor", application, "removal delivered");
            }
            EventKind::RemovalClosed => {
                warn!(
                    target: "unitvisor",
                    application,
                    "removal channel closed, worker already dying"
                );
            }
            EventKind::WorkerStopped => {
                info!(target: "unitvisor", application, "worker stopped");
            }
            EventKind::WorkerStopFailed => {
                error!(
                    target: "unitvisor",
                    application,
                    error = reason,
                    "stopping application worker failed"
                );
            }
            EventKind::ApplicationRemoved => {
                info!(target: "unitvisor", application, "application removed upstream");
            }
            EventKind::ServiceEnsured => {
                debug!(target: "unitvisor", application, units = e.units, "service ensured");
            }
            EventKind::ApplicationServiceUpdated => {
                debug!(
                    target: "unitvisor",
                    application,
                    status = reason,
                    "application status updated"
                );
            }
            EventKind::UnitsUpdated => {
                debug!(
                    target: "unitvisor",
                    application,
                    units = e.units,
                    "unit statuses updated"
                );
            }
            EventKind::ProvisionerStopped => match e.reason.as_deref() {
                Some(err) => error!(target: "unitvisor", error = err, "provisioner stopped"),
                None => info!(target: "unitvisor", "provisioner stopped"),
            },
            EventKind::SubscriberOverflow => {
                warn!(
                    target: "unitvisor",
                    subscriber = application,
                    reason,
                    "subscriber dropped event"
                );
            }
            EventKind::SubscriberPanicked => {
                error!(
                    target: "unitvisor",
                    subscriber = application,
                    info = reason,
                    "subscriber panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
