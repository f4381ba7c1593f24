//! Tracked entity contract shared by every windowed collection.

use std::fmt;

use crate::domain::foundation::EntityId;

/// Kind of entity held by a snapshot collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Complaint,
    Notification,
    Statistics,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Complaint => "complaint",
            EntityKind::Notification => "notification",
            EntityKind::Statistics => "statistics",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity addressable by a stable id.
///
/// Equality is payload equality: two values with the same id but different
/// fields compare unequal, which is how idempotent upserts are detected.
pub trait TrackedEntity: Clone + PartialEq + Send + Sync + 'static {
    /// Kind used in logs and store change notifications.
    const KIND: EntityKind;

    /// Stable identifier of this entity.
    fn entity_id(&self) -> &EntityId;
}
