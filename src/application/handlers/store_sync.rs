//! StoreSynchronizer - Merges live complaint and statistics events into the
//! snapshot store.
//!
//! Notifications are merged by `NotificationDelivery`, which also needs the
//! merge outcome to decide whether to toast.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::SnapshotStore;
use crate::domain::civic::{ComplaintChange, StatisticsSnapshot};
use crate::domain::foundation::{DomainError, ErrorCode, EventKind, LiveEvent};
use crate::ports::EventHandler;

/// Event kinds this handler expects to be subscribed to.
pub const STORE_SYNC_KINDS: [EventKind; 3] = [
    EventKind::ComplaintUpserted,
    EventKind::ComplaintRemoved,
    EventKind::StatisticsUpdated,
];

pub struct StoreSynchronizer {
    store: Arc<SnapshotStore>,
}

impl StoreSynchronizer {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for StoreSynchronizer {
    async fn handle(&self, event: LiveEvent) -> Result<(), DomainError> {
        match event.kind {
            EventKind::ComplaintUpserted | EventKind::ComplaintRemoved => {
                match ComplaintChange::from_payload(&event.payload)? {
                    ComplaintChange::Upserted { complaint, .. } => {
                        let id = complaint.complaint_id.clone();
                        let merge = self.store.upsert_complaint(*complaint);
                        tracing::debug!(
                            complaint_id = %id,
                            source = %event.source,
                            list = ?merge.list,
                            map = ?merge.map,
                            "complaint merged"
                        );
                    }
                    ComplaintChange::Removed { id } => {
                        let removed = self.store.remove_complaint(&id);
                        tracing::debug!(complaint_id = %id, removed, "complaint removed");
                    }
                }
                Ok(())
            }
            EventKind::StatisticsUpdated => {
                let statistics: StatisticsSnapshot = event.payload_as()?;
                self.store.replace_statistics(statistics);
                Ok(())
            }
            other => Err(DomainError::new(
                ErrorCode::Unsupported,
                format!("StoreSynchronizer does not handle {}", other),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "StoreSynchronizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::civic::{ChangeAction, Complaint};
    use crate::domain::foundation::{EntityId, EventSource};
    use serde_json::json;

    fn upsert_event(complaint: Complaint) -> LiveEvent {
        let payload = ComplaintChange::Upserted {
            action: ChangeAction::Updated,
            complaint: Box::new(complaint),
        }
        .to_payload()
        .unwrap();
        LiveEvent::new(EventKind::ComplaintUpserted, EventSource::Socket, payload)
    }

    #[tokio::test]
    async fn upsert_then_remove() {
        let store = Arc::new(SnapshotStore::default());
        let handler = StoreSynchronizer::new(Arc::clone(&store));

        handler.handle(upsert_event(Complaint::new(4, "Broken bench"))).await.unwrap();
        assert!(store.complaint(&EntityId::from(4)).is_some());

        let removal = LiveEvent::new(
            EventKind::ComplaintRemoved,
            EventSource::Socket,
            json!({"action": "DELETED", "complaintId": 4}),
        );
        handler.handle(removal).await.unwrap();
        assert!(store.complaint(&EntityId::from(4)).is_none());
    }

    #[tokio::test]
    async fn statistics_replace_singleton() {
        let store = Arc::new(SnapshotStore::default());
        let handler = StoreSynchronizer::new(Arc::clone(&store));
        let event = LiveEvent::new(
            EventKind::StatisticsUpdated,
            EventSource::Socket,
            json!({"totalComplaints": 9, "pendingComplaints": null}),
        );

        handler.handle(event).await.unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_complaints, 9);
        assert_eq!(stats.pending_complaints, 0);
    }

    #[tokio::test]
    async fn bad_payload_leaves_store_untouched() {
        let store = Arc::new(SnapshotStore::default());
        let handler = StoreSynchronizer::new(Arc::clone(&store));
        let event = LiveEvent::new(EventKind::ComplaintUpserted, EventSource::Socket, json!([1, 2]));

        assert!(handler.handle(event).await.is_err());
        assert!(store.complaints().items.is_empty());
    }
}
