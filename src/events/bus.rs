//! # Bus: broadcast channel shared by every event publisher.
//!
//! The root loop, each application worker and the subscriber lanes publish here.
//! The provisioner keeps one receiver (the forwarder into the
//! [`SubscriberSet`](crate::SubscriberSet)); callers of
//! [`Provisioner::subscribe`](crate::Provisioner::subscribe) get their own.
//!
//! ```text
//! root loop ───────┐
//! AppWorker "a" ───┼──► Bus ──┬──► forwarder ──► SubscriberSet
//! AppWorker "b" ───┤          └──► Provisioner::subscribe()
//! subscriber lanes ┘
//! ```
//!
//! ## Rules
//! - `publish` never waits and never fails; with no receiver the event is gone.
//! - One ring buffer of `capacity` events; a receiver that falls further behind
//!   gets `RecvError::Lagged` and resumes at the oldest retained event.

use tokio::sync::broadcast;

use crate::events::Event;

/// Cloneable publishing handle.
#[derive(Debug, Clone)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus retaining up to `capacity` events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_events_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::WorkerStarted));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::WorkerStopped).with_application("app1"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::WorkerStopped);
        assert!(ev.is_for("app1"));
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_oldest() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        for app in ["a", "b", "c"] {
            bus.publish(Event::new(EventKind::WorkerStarted).with_application(app));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert!(rx.recv().await.expect("retained").is_for("b"));
    }
}
