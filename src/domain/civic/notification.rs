//! Notification entity delivered over the stream and the notification topic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use super::null_as_default;
use crate::domain::foundation::{EntityId, Timestamp};
use crate::domain::snapshot::{EntityKind, SortSpec, TrackedEntity};

/// Category of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    #[default]
    Info,
    StatusChange,
    Comment,
    Assignment,
    Other(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Info => "INFO",
            NotificationType::StatusChange => "STATUS_CHANGE",
            NotificationType::Comment => "COMMENT",
            NotificationType::Assignment => "ASSIGNMENT",
            NotificationType::Other(s) => s,
        }
    }
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "INFO" => NotificationType::Info,
            "STATUS_CHANGE" => NotificationType::StatusChange,
            "COMMENT" => NotificationType::Comment,
            "ASSIGNMENT" => NotificationType::Assignment,
            _ => NotificationType::Other(value),
        }
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification addressed to the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "notificationId")]
    pub id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaint_id: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaint_title: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,

    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<Timestamp>,

    #[serde(default, alias = "read", deserialize_with = "null_as_default")]
    pub is_read: bool,

    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub kind: NotificationType,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Notification {
    /// Creates an unread INFO notification.
    pub fn new(id: impl Into<EntityId>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: None,
            complaint_id: None,
            complaint_title: None,
            message: message.into(),
            sent_at: None,
            is_read: false,
            kind: NotificationType::default(),
            extra: Map::new(),
        }
    }

    /// Newest-first ordering used by the notification feed.
    pub fn newest_first() -> SortSpec<Notification> {
        SortSpec::descending("sentAt", |n: &Notification| n.sent_at.into())
    }
}

impl TrackedEntity for Notification {
    const KIND: EntityKind = EntityKind::Notification;

    fn entity_id(&self) -> &EntityId {
        &self.id
    }
}
