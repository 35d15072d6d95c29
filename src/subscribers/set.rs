//! # SubscriberSet: per-subscriber queues in front of every [`Subscribe`].
//!
//! The provisioner's forwarder calls [`emit`](SubscriberSet::emit) for each bus
//! event; the call only enqueues. One task per subscriber drains its queue and
//! runs `on_event`.
//!
//! ```text
//! emit(&Event) ──► Arc<Event> ──┬──► [lane "LogWriter"] ──► drain ──► on_event()
//!                               ├──► [lane "audit"]     ──► drain ──► on_event()
//!                               └──► ...
//!                                         panic ──► Bus: SubscriberPanicked
//!               lane full/closed ──► Bus: SubscriberOverflow
//! ```
//!
//! ## Rules
//! - `emit` never waits; each lane is FIFO, lanes are unordered relative to each other.
//! - An overflow or a panic affects one subscriber and is reported on the bus.
//! - An overflow report that itself overflows is not reported again.
//! - A panic while handling a subscriber report is not reported again.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Queue into one subscriber.
struct Lane {
    subscriber: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out over the configured subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    drains: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one draining task per subscriber. Queue capacity is at least 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());
        let mut drains = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            lanes.push(Lane {
                subscriber: sub.name(),
                tx,
            });
            drains.push(tokio::spawn(drain(sub, rx, bus.clone())));
        }
        Self { lanes, drains, bus }
    }

    /// Enqueues `event` for every subscriber.
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Like [`emit`](Self::emit) without the extra clone.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let report = event.kind != EventKind::SubscriberOverflow;

        for lane in &self.lanes {
            let why = match lane.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if report {
                self.bus.publish(Event::subscriber_overflow(lane.subscriber, why));
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Closes every lane and waits until the queued events are handled.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for drain in self.drains {
            let _ = drain.await;
        }
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        let Err(payload) = handled else { continue };
        if is_report(ev.kind) {
            continue;
        }
        bus.publish(Event::subscriber_panicked(sub.name(), panic_message(payload.as_ref())));
    }
}

/// Events the set publishes about its own subscribers.
fn is_report(kind: EventKind) -> bool {
    matches!(kind, EventKind::SubscriberPanicked | EventKind::SubscriberOverflow)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber exploded");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let bus = Bus::new(16);
        let recorder = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![recorder.clone() as Arc<dyn Subscribe>], bus);

        set.emit(&Event::new(EventKind::WorkerStarted));
        set.emit(&Event::new(EventKind::WorkerStopped));
        set.shutdown().await;

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![EventKind::WorkerStarted, EventKind::WorkerStopped]
        );
    }

    #[tokio::test]
    async fn test_panic_is_reported_on_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicker) as Arc<dyn Subscribe>], bus);

        set.emit(&Event::new(EventKind::ServiceDeleted));

        let ev = rx.recv().await.expect("panic event");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert!(ev.is_for("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_panic_on_panic_report_is_not_reported_again() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let panicker = Arc::new(Panicker) as Arc<dyn Subscribe>;
        let set = SubscriberSet::new(vec![panicker], bus.clone());

        set.emit(&Event::new(EventKind::ServiceDeleted));
        let report = rx.recv().await.expect("panic event");
        assert_eq!(report.kind, EventKind::SubscriberPanicked);

        // Feed the report back in the way the provisioner's forwarder does.
        set.emit(&report);
        set.emit(&Event::subscriber_overflow("recorder", "full"));
        set.shutdown().await;

        assert!(
            matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)),
            "a panic on a report must not publish another report"
        );
    }
}
