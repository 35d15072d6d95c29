//! # The `Subscribe` extension point.
//!
//! Hosts observe the provisioner by handing [`Subscribe`] implementations to
//! [`ProvisionerConfig::with_subscribers`](crate::ProvisionerConfig::with_subscribers).
//! This is how a logger reaches the core: explicitly, per provisioner, never
//! through a process-wide global.
//!
//! Each subscriber gets its own bounded queue inside the
//! [`SubscriberSet`](crate::SubscriberSet). A full queue drops the event for that
//! subscriber only and reports [`EventKind::SubscriberOverflow`](crate::EventKind::SubscriberOverflow).

use async_trait::async_trait;

use crate::events::Event;

/// Receives every runtime event of one provisioner.
///
/// Slow handlers only delay their own queue; the root loop and the workers never wait on them.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic events. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length before events start being dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
