//! # Runtime events emitted by the provisioner and its application workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Dispatch events**: decisions of the root loop (skip, start, clean up)
//! - **Removal events**: outcome of the notify-before-kill handshake and worker stop
//! - **Convergence events**: broker writes performed by an application worker
//! - **Subscriber events**: overflow/panic of event subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! application name, a reason and a unit count.
//!
//! ## Ordering
//! `seq` is process-wide and strictly increasing; subscribers that see events
//! from several lanes can sort on it.
//!
//! ## Example
//! ```rust
//! use unitvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ServiceEnsured)
//!     .with_application("app1")
//!     .with_units(3);
//!
//! assert_eq!(ev.kind, EventKind::ServiceEnsured);
//! assert_eq!(ev.application.as_deref(), Some("app1"));
//! assert_eq!(ev.units, Some(3));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as SeqOrdering};
use std::sync::Arc;
use std::time::SystemTime;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // subscribers
    /// `on_event` panicked.
    ///
    /// Sets:
    /// - `application`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// An event was dropped for one subscriber.
    ///
    /// Sets:
    /// - `application`: subscriber name
    /// - `reason`: `subscriber=<name> reason=<full|closed>`
    SubscriberOverflow,

    // root loop decisions
    /// A changed application needs no new worker (already running, or dead before first seen).
    ///
    /// Sets:
    /// - `application`: application name
    /// - `reason`: `"registered"` or `"dead"`
    ApplicationSkipped,

    /// External exposure of a deleted application's service was removed.
    ///
    /// Sets:
    /// - `application`: application name
    ServiceUnexposed,

    /// A deleted application's service was deleted.
    ///
    /// Sets:
    /// - `application`: application name
    ServiceDeleted,

    /// Application worker constructed, registered and attached.
    ///
    /// Sets:
    /// - `application`: application name
    /// - `reason`: `"managed-units"` when units are controller-managed
    WorkerStarted,

    // removal handshake
    /// The worker acknowledged the removal notice before being stopped.
    ///
    /// Sets:
    /// - `application`: application name
    RemovalDelivered,

    /// The worker was already dying (or gone); the removal channel was closed instead.
    ///
    /// Sets:
    /// - `application`: application name
    RemovalClosed,

    /// Worker stopped and deregistered.
    ///
    /// Sets:
    /// - `application`: application name
    WorkerStopped,

    /// Worker stop returned an error; it was deregistered anyway.
    /// Published instead of `WorkerStopped`.
    ///
    /// Sets:
    /// - `application`: application name
    /// - `reason`: stop error
    WorkerStopFailed,

    /// An application worker observed its removal notice and is exiting.
    ///
    /// Sets:
    /// - `application`: application name
    ApplicationRemoved,

    // application worker writes
    /// Service ensured for the current pod spec and unit count.
    ///
    /// Sets:
    /// - `application`: application name
    /// - `units`: number of alive units requested
    ServiceEnsured,

    /// Application status written from the orchestrator's service view.
    ///
    /// Sets:
    /// - `application`: application name
    /// - `reason`: service status
    ApplicationServiceUpdated,

    /// Unit statuses written from the orchestrator's unit view.
    ///
    /// Sets:
    /// - `application`: application name
    /// - `units`: number of orchestrator units reported
    UnitsUpdated,

    // shutdown
    /// Root loop finished (cleanly or with a fatal error).
    ///
    /// Sets:
    /// - `reason`: terminal error, if any
    ProvisionerStopped,
}

/// One runtime event. Which optional fields are set depends on [`EventKind`].
#[derive(Debug, Clone)]
pub struct Event {
    /// Process-wide ordering key.
    pub seq: u64,
    /// When it was created.
    pub at: SystemTime,
    pub kind: EventKind,
    /// Application (or subscriber) the event is about.
    pub application: Option<Arc<str>>,
    /// Human-readable reason (errors, skip causes, overflow details).
    pub reason: Option<Arc<str>>,
    /// Unit count, where relevant.
    pub units: Option<usize>,
}

impl Event {
    /// Stamps a new event of `kind` with the next `seq` and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, SeqOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            application: None,
            reason: None,
            units: None,
        }
    }

    /// Attaches an application name.
    #[inline]
    pub fn with_application(mut self, application: impl Into<Arc<str>>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Sets the free-form reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a unit count.
    #[inline]
    pub fn with_units(mut self, units: usize) -> Self {
        self.units = Some(units);
        self
    }

    /// `SubscriberOverflow` about `subscriber`.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_application(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// `SubscriberPanicked` about `subscriber`.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_application(subscriber)
            .with_reason(info)
    }

    /// True if this event is about `application`.
    #[inline]
    pub fn is_for(&self, application: &str) -> bool {
        self.application.as_deref() == Some(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerStarted);
        let b = Event::new(EventKind::WorkerStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_overflow_event_names_subscriber() {
        let ev = Event::subscriber_overflow("log", "full");
        assert!(ev.is_for("log"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=log reason=full"));
    }
}
