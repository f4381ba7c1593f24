//! Message routers - Turn wire messages into typed live events.
//!
//! Each live channel owns one router. A router returns `Ok(None)` for
//! messages that carry no domain data (control events, unknown topics) and an
//! error for payloads that cannot be parsed; the channel logs and drops both.

use serde_json::Value as JsonValue;

use crate::domain::civic::{ComplaintChange, Notification, StatisticsSnapshot};
use crate::domain::connection::Topic;
use crate::domain::foundation::{DomainError, EventId, EventKind, EventSource, LiveEvent};
use crate::ports::InboundMessage;

/// Maps inbound messages of one channel to live events.
pub trait MessageRouter: Send + Sync {
    fn route(&self, message: &InboundMessage) -> Result<Option<LiveEvent>, DomainError>;
}

fn envelope(kind: EventKind, source: EventSource, message: &InboundMessage, payload: JsonValue) -> LiveEvent {
    let event = LiveEvent::new(kind, source, payload).with_topic(message.channel.clone());
    match &message.message_id {
        Some(id) => event.with_event_id(EventId::from_string(format!("{}:{}", source, id))),
        None => event,
    }
}

/// Checks that a notification payload decodes before it is published.
fn notification_event(source: EventSource, message: &InboundMessage) -> Result<LiveEvent, DomainError> {
    let payload: JsonValue = serde_json::from_str(&message.body)?;
    serde_json::from_value::<Notification>(payload.clone())?;
    Ok(envelope(EventKind::NotificationReceived, source, message, payload))
}

/// Router for the STOMP socket topics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopicRouter;

impl MessageRouter for TopicRouter {
    fn route(&self, message: &InboundMessage) -> Result<Option<LiveEvent>, DomainError> {
        let source = EventSource::Socket;
        match message.channel.as_str() {
            c if c == Topic::COMPLAINTS.as_str() => {
                let payload: JsonValue = serde_json::from_str(&message.body)?;
                let change = ComplaintChange::from_payload(&payload)?;
                let kind = match change {
                    ComplaintChange::Upserted { .. } => EventKind::ComplaintUpserted,
                    ComplaintChange::Removed { .. } => EventKind::ComplaintRemoved,
                };
                Ok(Some(envelope(kind, source, message, change.to_payload()?)))
            }
            c if c == Topic::NOTIFICATIONS.as_str() => notification_event(source, message).map(Some),
            c if c == Topic::STATISTICS.as_str() => {
                let payload: JsonValue = serde_json::from_str(&message.body)?;
                serde_json::from_value::<StatisticsSnapshot>(payload.clone())?;
                Ok(Some(envelope(EventKind::StatisticsUpdated, source, message, payload)))
            }
            other => {
                tracing::debug!(topic = other, "message on unrouted topic");
                Ok(None)
            }
        }
    }
}

/// Router for the server-sent notification stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotificationStreamRouter;

impl MessageRouter for NotificationStreamRouter {
    fn route(&self, message: &InboundMessage) -> Result<Option<LiveEvent>, DomainError> {
        match message.channel.as_str() {
            "NOTIFICATION" | "message" => notification_event(EventSource::Stream, message).map(Some),
            "INIT" => {
                tracing::debug!(body = %message.body, "stream handshake");
                Ok(None)
            }
            other => {
                tracing::debug!(event = other, "ignoring stream event");
                Ok(None)
            }
        }
    }
}
