//! # Removal signal: one-shot "your application is gone" notice.
//!
//! The root loop must make sure a worker sees the removal notice *before* it is
//! asked to stop, without blocking forever on a worker that is already exiting.
//! The signal is a rendezvous: [`RemovalNotifier::notify`] hands the notice over
//! and then races the receiver's acknowledgement against the worker's death signal.
//!
//! ```text
//! root loop                               application worker
//! ─────────                               ──────────────────
//! notify(dying)
//!   ├─► send(ack_tx) ─────────────────►  RemovalReceiver::recv()
//!   │                                        └─► ack_tx.send(())
//!   └─► select (biased)
//!         ├─ ack received    → Delivered
//!         ├─ ack dropped     → Closed
//!         └─ dying fired     → Closed     (notice abandoned, sender released)
//! ```
//!
//! ## Rules
//! - The notifier is consumed: the notice fires at most once.
//! - A receiver whose notifier is dropped observes that as removal too.
//! - The notifier never blocks once the worker is dying.

use tokio::sync::oneshot;
use tokio_util::sync::WaitForCancellationFuture;

/// How a removal notice ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The worker took the notice before it was stopped.
    Delivered,
    /// The worker was already dying or gone; the channel was closed instead.
    Closed,
}

/// A fresh, unfired removal channel: both halves, before the worker takes them apart.
#[derive(Debug)]
pub struct RemovalSignal {
    notifier: RemovalNotifier,
    receiver: RemovalReceiver,
}

impl RemovalSignal {
    /// Creates a connected notifier/receiver pair.
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            notifier: RemovalNotifier { tx },
            receiver: RemovalReceiver { rx: Some(rx) },
        }
    }

    /// Splits into the sending and the receiving half.
    pub fn split(self) -> (RemovalNotifier, RemovalReceiver) {
        (self.notifier, self.receiver)
    }
}

impl Default for RemovalSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending half, fired by the root loop.
#[derive(Debug)]
pub struct RemovalNotifier {
    tx: oneshot::Sender<oneshot::Sender<()>>,
}

impl RemovalNotifier {
    /// Delivers the notice unless the worker dies first.
    ///
    /// `dying` is the worker's death signal. An acknowledgement that is already in
    /// wins over it, so a worker that took the notice and then started exiting
    /// still reads as [`RemovalOutcome::Delivered`].
    pub async fn notify(self, dying: WaitForCancellationFuture<'_>) -> RemovalOutcome {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(ack_tx).is_err() {
            return RemovalOutcome::Closed;
        }

        tokio::select! {
            biased;
            ack = ack_rx => match ack {
                Ok(()) => RemovalOutcome::Delivered,
                Err(_) => RemovalOutcome::Closed,
            },
            _ = dying => RemovalOutcome::Closed,
        }
    }
}

/// Receiving half, owned by the application worker's loop.
#[derive(Debug)]
pub struct RemovalReceiver {
    rx: Option<oneshot::Receiver<oneshot::Sender<()>>>,
}

impl RemovalReceiver {
    /// Completes when the notice arrives or the notifier is dropped.
    ///
    /// Cancel-safe; once it has completed it stays pending forever, so it can sit
    /// in a select loop.
    pub async fn recv(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };
        if let Ok(ack) = rx.await {
            let _ = ack.send(());
        }
        self.rx = None;
    }

    /// True once the notice (or the close) has been observed.
    pub fn is_terminated(&self) -> bool {
        self.rx.is_none()
    }
}
