//! EventSubscriber port - Interface for subscribing to live events.
//!
//! Consumers register per event kind and never learn which transport
//! produced an event.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventKind, LiveEvent, SubscriptionId};

/// Handler for processing live events.
///
/// Implementations should be:
/// - **Idempotent** - The same entity may arrive over both channels
/// - **Quick** - Anything slow is spawned, never awaited inline
/// - **Isolated** - Errors are logged by the bus and go no further
///
/// # Example
///
/// ```ignore
/// struct BadgeLogger;
///
/// #[async_trait]
/// impl EventHandler for BadgeLogger {
///     async fn handle(&self, event: LiveEvent) -> Result<(), DomainError> {
///         let notification: Notification = event.payload_as()?;
///         tracing::info!(id = %notification.id, "notification");
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "BadgeLogger"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: LiveEvent) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to live events.
///
/// There is no replay: a handler only sees events published after it
/// subscribed.
///
/// # Example
///
/// ```ignore
/// let id = subscriber.subscribe(EventKind::NotificationReceived, delivery);
/// subscriber.unsubscribe(id);
/// ```
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to one event kind.
    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> SubscriptionId;

    /// Subscribe the same handler to several kinds.
    fn subscribe_all(&self, kinds: &[EventKind], handler: Arc<dyn EventHandler>) -> Vec<SubscriptionId> {
        kinds
            .iter()
            .map(|kind| self.subscribe(*kind, Arc::clone(&handler)))
            .collect()
    }

    /// Removes a registration. Returns false if it was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Combined trait for event bus implementations.
///
/// An EventBus provides both publishing and subscribing capabilities.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

// Blanket implementation - any type that implements both traits is an EventBus
impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}
