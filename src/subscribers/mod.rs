//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Provisioner / AppWorker ── publish(Event) ──► Bus ──► forwarder ──► SubscriberSet::emit
//!                                                                          │
//!                                                              ┌───────────┼──────────┐
//!                                                              ▼           ▼          ▼
//!                                                          LogWriter    Metrics    Custom ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use unitvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct RemovalAudit;
//!
//! #[async_trait]
//! impl Subscribe for RemovalAudit {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ServiceDeleted {
//!             // write audit record...
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "removal-audit" }
//! }
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
