//! Supervision core: worker lifecycle and the supervision tree.
//!
//! Internal modules:
//! - `worker`: the [`Worker`] trait (`kill` / `wait`) and the [`stop`] helper;
//! - `supervisor`: a node of the supervision tree with cascading cancellation and
//!   first-error aggregation.

mod supervisor;
mod worker;

pub use supervisor::Supervisor;
pub use worker::{Worker, WorkerRef, stop};
