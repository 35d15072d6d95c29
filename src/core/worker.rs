//! # Worker abstraction.
//!
//! A [`Worker`] is a long-lived, cooperatively cancelled task with the standard
//! supervised lifecycle: [`kill`](Worker::kill) asks it to stop (idempotent,
//! never blocks) and [`wait`](Worker::wait) blocks until it has stopped and
//! returns its terminal error.
//!
//! The common handle type is [`WorkerRef`], an `Arc<dyn Worker>` suitable for
//! attaching to a [`Supervisor`](crate::Supervisor).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkerError;

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// # Killable, waitable task.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use unitvisor::{Worker, WorkerError};
///
/// struct Idle {
///     token: CancellationToken,
/// }
///
/// #[async_trait]
/// impl Worker for Idle {
///     fn name(&self) -> &str { "idle" }
///
///     fn kill(&self) { self.token.cancel(); }
///
///     async fn wait(&self) -> Result<(), WorkerError> {
///         self.token.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Requests cooperative shutdown. Idempotent; does not block.
    fn kill(&self);

    /// Blocks until the worker has finished and returns its terminal error.
    async fn wait(&self) -> Result<(), WorkerError>;
}

/// Kills `worker` and waits for it to finish.
pub async fn stop<W: Worker + ?Sized>(worker: &W) -> Result<(), WorkerError> {
    worker.kill();
    worker.wait().await
}
