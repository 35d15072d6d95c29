//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the provisioner loop,
//! the application workers and the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Provisioner` loop, `ApplicationWorker`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the provisioner's forwarder (fans out to `SubscriberSet`) and
//!   any receiver obtained from `Provisioner::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
