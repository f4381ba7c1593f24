//! In-memory event bus.
//!
//! Delivers each event to the handlers registered for its kind, one after
//! another in registration order, before `publish` returns. A handler that
//! returns an error or panics is logged and skipped; delivery continues with
//! the next handler.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::{DomainError, EventKind, LiveEvent, SubscriptionId};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

struct Registration {
    id: SubscriptionId,
    kind: EventKind,
    handler: Arc<dyn EventHandler>,
}

/// In-process publish/subscribe bus.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// let id = bus.subscribe(EventKind::ComplaintUpserted, store_sync);
/// bus.publish(event).await?;
/// bus.unsubscribe(id);
/// ```
pub struct InMemoryEventBus {
    registrations: RwLock<Vec<Registration>>,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
        }
    }

    /// Number of handlers registered for a kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: LiveEvent) -> Result<(), DomainError> {
        // Clone handlers to release lock before await points
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.kind == event.kind)
            .map(|r| Arc::clone(&r.handler))
            .collect();

        if handlers.is_empty() {
            tracing::trace!(kind = %event.kind, "no handlers registered");
            return Ok(());
        }

        for handler in handlers {
            let outcome = AssertUnwindSafe(handler.handle(event.clone()))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        handler = handler.name(),
                        kind = %event.kind,
                        event_id = %event.event_id,
                        error = %e,
                        "event handler failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        handler = handler.name(),
                        kind = %event.kind,
                        event_id = %event.event_id,
                        "event handler panicked"
                    );
                }
            }
        }

        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId::new();
        tracing::debug!(handler = handler.name(), kind = %kind, "handler subscribed");
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration { id, kind, handler });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, EventSource};
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every delivery into a shared log.
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: LiveEvent) -> Result<(), DomainError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.kind));
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.label
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle(&self, _event: LiveEvent) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::HandlerFailed, "boom"))
        }

        fn name(&self) -> &'static str {
            "Failing"
        }
    }

    struct Panicking;

    #[async_trait]
    impl EventHandler for Panicking {
        async fn handle(&self, _event: LiveEvent) -> Result<(), DomainError> {
            panic!("handler exploded");
        }

        fn name(&self) -> &'static str {
            "Panicking"
        }
    }

    fn recorder(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn EventHandler> {
        Arc::new(Recorder {
            label,
            log: Arc::clone(log),
        })
    }

    fn event(kind: EventKind) -> LiveEvent {
        LiveEvent::new(kind, EventSource::Local, json!({}))
    }

    // ============================================================
    // Delivery
    // ============================================================

    #[tokio::test]
    async fn delivers_in_registration_order() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::ComplaintUpserted, recorder("a", &log));
        bus.subscribe(EventKind::ComplaintUpserted, recorder("b", &log));
        bus.subscribe(EventKind::ComplaintUpserted, recorder("c", &log));

        bus.publish(event(EventKind::ComplaintUpserted)).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:complaint.upserted",
                "b:complaint.upserted",
                "c:complaint.upserted"
            ]
        );
    }

    #[tokio::test]
    async fn only_matching_kind_is_delivered() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::NotificationReceived, recorder("n", &log));

        bus.publish(event(EventKind::StatisticsUpdated)).await.unwrap();

        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_second_subscriber_does_not_block_others() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::ComplaintUpserted, recorder("first", &log));
        bus.subscribe(EventKind::ComplaintUpserted, Arc::new(Failing));
        bus.subscribe(EventKind::ComplaintUpserted, recorder("third", &log));

        let result = bus.publish(event(EventKind::ComplaintUpserted)).await;

        assert!(result.is_ok());
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn panicking_subscriber_is_isolated() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::ComplaintUpserted, recorder("first", &log));
        bus.subscribe(EventKind::ComplaintUpserted, Arc::new(Panicking));
        bus.subscribe(EventKind::ComplaintUpserted, recorder("third", &log));

        bus.publish(event(EventKind::ComplaintUpserted)).await.unwrap();
        bus.publish(event(EventKind::ComplaintUpserted)).await.unwrap();

        assert_eq!(log.lock().unwrap().len(), 4);
    }

    // ============================================================
    // Registration
    // ============================================================

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = bus.subscribe(EventKind::ComplaintRemoved, recorder("x", &log));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(event(EventKind::ComplaintRemoved)).await.unwrap();

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(bus.handler_count(EventKind::ComplaintRemoved), 0);
    }

    #[tokio::test]
    async fn late_subscriber_sees_no_replay() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.publish(event(EventKind::StatisticsUpdated)).await.unwrap();

        bus.subscribe(EventKind::StatisticsUpdated, recorder("late", &log));

        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscribe_all_registers_each_kind() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let ids = bus.subscribe_all(
            &[EventKind::ComplaintUpserted, EventKind::ComplaintRemoved],
            recorder("both", &log),
        );

        bus.publish(event(EventKind::ComplaintRemoved)).await.unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["both:complaint.removed"]);
    }
}
