//! # Change subscriptions.
//!
//! A [`Watcher`] pairs a channel of change notifications with the [`Worker`] that
//! produces them. Consumers split it with [`into_parts`](Watcher::into_parts),
//! attach the worker to their [`Supervisor`] (so a failing subscription is fatal
//! to them and dies with them) and read the channel in their select loop.
//!
//! A closed channel means the subscription ended; consumers treat it as
//! [`WorkerError::WatcherClosed`](crate::WorkerError::WatcherClosed).

use std::borrow::Cow;

use tokio::sync::mpsc;

use crate::core::{Supervisor, WorkerRef};

/// Subscription yielding batches of changed names.
pub type StringsWatcher = Watcher<Vec<String>>;

/// Subscription yielding bare "something changed" notifications.
pub type NotifyWatcher = Watcher<()>;

/// A change channel plus the worker feeding it.
pub struct Watcher<T> {
    changes: mpsc::Receiver<T>,
    worker: WorkerRef,
}

impl<T: Send + 'static> Watcher<T> {
    /// Pairs an existing change channel with the worker that feeds it.
    pub fn new(changes: mpsc::Receiver<T>, worker: WorkerRef) -> Self {
        Self { changes, worker }
    }

    /// Wraps a plain channel in a trivial supervised worker that only waits to be killed.
    ///
    /// # Example
    /// ```
    /// use tokio::sync::mpsc;
    /// use unitvisor::StringsWatcher;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let (tx, rx) = mpsc::channel(4);
    /// let (mut changes, worker) = StringsWatcher::from_receiver("apps", rx).into_parts();
    /// tx.send(vec!["app1".to_string()]).await.unwrap();
    /// assert_eq!(changes.recv().await, Some(vec!["app1".to_string()]));
    /// worker.kill();
    /// assert_eq!(worker.wait().await, Ok(()));
    /// # }
    /// ```
    pub fn from_receiver(name: impl Into<Cow<'static, str>>, changes: mpsc::Receiver<T>) -> Self {
        let worker = Supervisor::invoke(name, |node| async move {
            node.dying().await;
            Ok(())
        });
        Self { changes, worker }
    }

    /// Returns the worker feeding the channel.
    pub fn worker(&self) -> &WorkerRef {
        &self.worker
    }

    /// Splits into the change channel and its worker.
    pub fn into_parts(self) -> (mpsc::Receiver<T>, WorkerRef) {
        (self.changes, self.worker)
    }
}
