//! NotificationDelivery - Merges arriving notifications into the store and
//! raises auto-dismissing toasts.
//!
//! The same notification can arrive over the socket topic and the stream.
//! Only the first arrival of an id is toasted, whether or not the
//! notification window keeps it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::SnapshotStore;
use crate::domain::civic::{ChangeAction, ComplaintChange, Notification};
use crate::domain::foundation::{DomainError, EventKind, LiveEvent};
use crate::ports::{EventHandler, Toast, ToastLevel, ToastSink};

/// Event kinds this handler expects to be subscribed to.
pub const DELIVERY_KINDS: [EventKind; 2] = [EventKind::NotificationReceived, EventKind::ComplaintUpserted];

pub struct NotificationDelivery {
    store: Arc<SnapshotStore>,
    toasts: Arc<dyn ToastSink>,
    lifetime: Duration,
    announce_complaint_updates: bool,
}

impl NotificationDelivery {
    pub fn new(store: Arc<SnapshotStore>, toasts: Arc<dyn ToastSink>) -> Self {
        Self {
            store,
            toasts,
            lifetime: Duration::from_secs(5),
            announce_complaint_updates: true,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_complaint_updates(mut self, announce: bool) -> Self {
        self.announce_complaint_updates = announce;
        self
    }

    /// Shows the toast and schedules its dismissal without waiting for it.
    fn raise(&self, level: ToastLevel, message: String) {
        let toast = Toast::new(level, message, self.lifetime);
        self.toasts.show(&toast);

        let sink = Arc::clone(&self.toasts);
        let id = toast.id;
        let lifetime = toast.lifetime;
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            sink.dismiss(id);
        });
    }

    fn on_notification(&self, event: &LiveEvent) -> Result<(), DomainError> {
        let notification: Notification = event.payload_as()?;
        let message = notification.message.clone();
        let id = notification.id.clone();

        let merge = self.store.upsert_notification(notification);
        if !merge.first_arrival {
            tracing::debug!(notification_id = %id, source = %event.source, "duplicate notification");
            return Ok(());
        }
        if !message.is_empty() {
            self.raise(ToastLevel::Info, message);
        }
        Ok(())
    }

    fn on_complaint(&self, event: &LiveEvent) -> Result<(), DomainError> {
        if !self.announce_complaint_updates {
            return Ok(());
        }
        if let ComplaintChange::Upserted { action, complaint } = ComplaintChange::from_payload(&event.payload)? {
            match action {
                ChangeAction::Created => {
                    self.raise(ToastLevel::Success, "A new complaint has been added".to_string())
                }
                ChangeAction::Updated => self.raise(
                    ToastLevel::Info,
                    format!("Complaint \"{}\" has been updated", complaint.title),
                ),
                ChangeAction::Deleted => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for NotificationDelivery {
    async fn handle(&self, event: LiveEvent) -> Result<(), DomainError> {
        match event.kind {
            EventKind::NotificationReceived => self.on_notification(&event),
            EventKind::ComplaintUpserted => self.on_complaint(&event),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "NotificationDelivery"
    }
}
