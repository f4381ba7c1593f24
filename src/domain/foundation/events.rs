//! Live event envelope published on the in-process event bus.
//!
//! - `EventId` - Unique identifier for a delivered event
//! - `EventKind` - Routing key consumers subscribe to
//! - `EventSource` - Which channel produced the event
//! - `LiveEvent` - Transport wrapper carrying the JSON payload

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Unique identifier for events.
///
/// Uses a String internally so ids minted elsewhere (STOMP `message-id`,
/// SSE `id:` lines) can be carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new random EventId using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates an EventId from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a live event; the key handlers subscribe under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A complaint was created or changed.
    ComplaintUpserted,
    /// A complaint was deleted.
    ComplaintRemoved,
    /// A notification arrived for the current user.
    NotificationReceived,
    /// The statistics aggregate was pushed.
    StatisticsUpdated,
    /// A live channel changed connection state.
    ConnectionChanged,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::ComplaintUpserted,
        EventKind::ComplaintRemoved,
        EventKind::NotificationReceived,
        EventKind::StatisticsUpdated,
        EventKind::ConnectionChanged,
    ];

    /// Dotted name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ComplaintUpserted => "complaint.upserted",
            EventKind::ComplaintRemoved => "complaint.removed",
            EventKind::NotificationReceived => "notification.received",
            EventKind::StatisticsUpdated => "statistics.updated",
            EventKind::ConnectionChanged => "connection.changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// The bidirectional STOMP socket.
    Socket,
    /// The server-sent notification stream.
    Stream,
    /// Raised in-process (REST write-through, lifecycle changes).
    Local,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventSource::Socket => "socket",
            EventSource::Stream => "stream",
            EventSource::Local => "local",
        };
        f.write_str(s)
    }
}

/// Envelope for an event delivered through the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    /// Unique ID for this event instance.
    pub event_id: EventId,

    /// Routing key.
    pub kind: EventKind,

    /// Channel that produced the event.
    pub source: EventSource,

    /// When the event was received or raised locally.
    pub received_at: Timestamp,

    /// Event-specific payload as JSON.
    pub payload: JsonValue,

    /// Topic or stream event name the payload arrived on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl LiveEvent {
    /// Creates a new event stamped with a fresh id and the current time.
    pub fn new(kind: EventKind, source: EventSource, payload: JsonValue) -> Self {
        Self {
            event_id: EventId::new(),
            kind,
            source,
            received_at: Timestamp::now(),
            payload,
            topic: None,
        }
    }

    /// Records the topic the payload arrived on.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Replaces the generated id with one supplied by the wire.
    pub fn with_event_id(mut self, id: EventId) -> Self {
        self.event_id = id;
        self
    }

    /// Deserialize payload to a specific type.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}
