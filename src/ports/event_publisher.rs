//! EventPublisher port - Interface for publishing live events.
//!
//! Transports and application services publish through this port without
//! knowing who consumes the events.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, LiveEvent};

/// Port for publishing live events.
///
/// Implementations must ensure:
/// - Handlers for the event's kind run in registration order
/// - A failing handler does not prevent delivery to the others
/// - `publish` returns only after every handler has run
///
/// # Example
///
/// ```ignore
/// let event = LiveEvent::new(EventKind::ComplaintUpserted, EventSource::Socket, payload);
/// publisher.publish(event).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: LiveEvent) -> Result<(), DomainError>;

    /// Publish several events in order.
    async fn publish_all(&self, events: Vec<LiveEvent>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn EventPublisher) {}
}
