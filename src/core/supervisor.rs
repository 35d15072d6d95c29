//! # Supervisor: one node of the supervision tree.
//!
//! A [`Supervisor`] runs one unit of work and owns any number of attached child
//! [`Worker`]s. It ties their lifecycles together:
//!
//! - the node's death signal is a [`CancellationToken`] that transitions once, Alive → Dying;
//! - killing the node kills every attached child;
//! - a child that fails kills the node, and its error becomes the node's terminal error
//!   unless an earlier one was already recorded;
//! - [`wait`](Supervisor::wait) returns only after the work **and** every child have finished.
//!
//! ## Architecture
//! ```text
//! Supervisor::invoke(name, work)
//!   └─► tokio::spawn(drive)
//!         ├─► tokio::spawn(work(node))        (panic → WorkerError::Panicked)
//!         ├─► kill(result.err())              (records reason, fires death signal)
//!         ├─► close children tracker          (no more attachments)
//!         ├─► children.wait()                 (all supervise() tasks joined)
//!         └─► done.cancel()                   (wait() returns)
//!
//! node.add(child)
//!   └─► children.spawn(supervise(child))
//!         ├─ child.wait() returns first   → Err(e) ⇒ node.kill(Some(e))
//!         └─ node dying first             → child.kill(); child.wait()
//!                                           Err(e) ⇒ node.kill(Some(e))
//! ```
//!
//! ## Rules
//! - The first non-`Dying` error by arrival order is the terminal error. A clean
//!   kill (`None`) may later be upgraded by an error; an error is never replaced.
//! - [`WorkerError::Dying`] is never recorded; returning it from work means
//!   "stopped because asked to".
//! - Attaching to a node that is already dying stops the child and returns
//!   [`WorkerError::Dying`].
//! - A node is itself a [`Worker`], so trees nest.

use std::borrow::Cow;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tokio_util::task::TaskTracker;

use crate::core::worker::{Worker, WorkerRef, stop};
use crate::error::WorkerError;

/// Mutable part of a node, guarded by a mutex that is never held across an await.
#[derive(Default)]
struct State {
    /// Terminal error, set at most once to a non-`None` value.
    reason: Option<WorkerError>,
    /// True once the node stopped accepting children.
    closed: bool,
}

/// Node of the supervision tree.
pub struct Supervisor {
    name: Cow<'static, str>,
    /// Death signal (Alive → Dying).
    dying: CancellationToken,
    /// Fired once the work and every child have finished.
    done: CancellationToken,
    state: Mutex<State>,
    children: TaskTracker,
}

impl Supervisor {
    /// Starts `work` as a new supervised node and returns the node.
    ///
    /// `work` receives the node itself so it can select on [`dying`](Self::dying)
    /// and [`add`](Self::add) children. When it returns, its error (if any) is
    /// recorded as the terminal error and the node starts dying.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Example
    /// ```
    /// use unitvisor::{Supervisor, WorkerError};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let node = Supervisor::invoke("ticker", |node| async move {
    ///     node.dying().await;
    ///     Ok::<_, WorkerError>(())
    /// });
    /// node.kill(None);
    /// assert_eq!(node.wait().await, Ok(()));
    /// # }
    /// ```
    pub fn invoke<F, Fut>(name: impl Into<Cow<'static, str>>, work: F) -> Arc<Self>
    where
        F: FnOnce(Arc<Supervisor>) -> Fut,
        Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        let node = Arc::new(Self {
            name: name.into(),
            dying: CancellationToken::new(),
            done: CancellationToken::new(),
            state: Mutex::new(State::default()),
            children: TaskTracker::new(),
        });

        let fut = work(Arc::clone(&node));
        tokio::spawn(Arc::clone(&node).drive(fut));
        node
    }

    /// Runs the work, then joins every child before reporting completion.
    async fn drive<Fut>(self: Arc<Self>, work: Fut)
    where
        Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        let result = match tokio::spawn(work).await {
            Ok(res) => res,
            Err(join_err) if join_err.is_panic() => Err(WorkerError::Panicked {
                name: self.name.to_string(),
            }),
            Err(_) => Err(WorkerError::Dying),
        };
        self.kill(result.err());

        {
            let mut state = self.lock();
            state.closed = true;
            self.children.close();
        }
        self.children.wait().await;
        self.done.cancel();
    }

    /// Returns the node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transitions the node to Dying and records `reason` per the first-error rule.
    ///
    /// Idempotent; never blocks.
    pub fn kill(&self, reason: Option<WorkerError>) {
        {
            let mut state = self.lock();
            match reason {
                None | Some(WorkerError::Dying) => {}
                Some(err) => {
                    if state.reason.is_none() {
                        state.reason = Some(err);
                    }
                }
            }
        }
        self.dying.cancel();
    }

    /// Completes once the node is dying.
    pub fn dying(&self) -> WaitForCancellationFuture<'_> {
        self.dying.cancelled()
    }

    /// True once the node is dying.
    pub fn is_dying(&self) -> bool {
        self.dying.is_cancelled()
    }

    /// True once the work and all children have finished.
    pub fn is_finished(&self) -> bool {
        self.done.is_cancelled()
    }

    /// The terminal error recorded so far (`None` for a clean stop or a live node).
    pub fn err(&self) -> Option<WorkerError> {
        self.lock().reason.clone()
    }

    /// Attaches `child` to this node.
    ///
    /// If the node is already dying the child is stopped instead; the child's
    /// error is returned if it has one, otherwise [`WorkerError::Dying`].
    pub async fn add(self: &Arc<Self>, child: WorkerRef) -> Result<(), WorkerError> {
        {
            let state = self.lock();
            if !state.closed && !self.is_dying() {
                self.children.spawn(Arc::clone(self).supervise(child));
                return Ok(());
            }
        }
        stop(child.as_ref()).await?;
        Err(WorkerError::Dying)
    }

    /// Couples one child to this node until the child finishes.
    async fn supervise(self: Arc<Self>, child: WorkerRef) {
        let wait = child.wait();
        tokio::pin!(wait);

        let finished = tokio::select! {
            res = &mut wait => Some(res),
            _ = self.dying.cancelled() => None,
        };
        let result = match finished {
            Some(res) => res,
            None => {
                child.kill();
                wait.await
            }
        };

        if let Err(err) = result {
            self.kill(Some(err));
        }
    }

    /// Blocks until the work and every attached child have finished.
    ///
    /// Returns the terminal error, or `Ok(())` on a clean stop.
    pub async fn wait(&self) -> Result<(), WorkerError> {
        self.done.cancelled().await;
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Worker for Supervisor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kill(&self) {
        Supervisor::kill(self, None);
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        Supervisor::wait(self).await
    }
}
