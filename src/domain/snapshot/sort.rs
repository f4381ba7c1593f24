//! Sort keys and ordering for snapshot windows.

use std::cmp::Ordering;
use std::fmt;

use super::TrackedEntity;
use crate::domain::foundation::Timestamp;

/// Extracted sort key value.
///
/// `Missing` always sorts after present values regardless of direction, so
/// entities lacking the key sink to the bottom of a window.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Int(i64),
    Time(Timestamp),
    Text(String),
    Missing,
}

impl From<Option<Timestamp>> for SortValue {
    fn from(value: Option<Timestamp>) -> Self {
        value.map(SortValue::Time).unwrap_or(SortValue::Missing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort key extractor plus direction for one window.
///
/// Ties are broken by ascending entity id, making the order total.
pub struct SortSpec<E> {
    name: &'static str,
    key: fn(&E) -> SortValue,
    direction: SortDirection,
}

impl<E> Clone for SortSpec<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for SortSpec<E> {}

impl<E> fmt::Debug for SortSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortSpec")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .finish()
    }
}

impl<E: TrackedEntity> SortSpec<E> {
    pub fn new(name: &'static str, key: fn(&E) -> SortValue, direction: SortDirection) -> Self {
        Self {
            name,
            key,
            direction,
        }
    }

    pub fn ascending(name: &'static str, key: fn(&E) -> SortValue) -> Self {
        Self::new(name, key, SortDirection::Ascending)
    }

    pub fn descending(name: &'static str, key: fn(&E) -> SortValue) -> Self {
        Self::new(name, key, SortDirection::Descending)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Extracts the sort key of an entity.
    pub fn key_of(&self, entity: &E) -> SortValue {
        (self.key)(entity)
    }

    /// Total order: key in the configured direction, then id ascending.
    pub fn compare(&self, a: &E, b: &E) -> Ordering {
        let by_key = match (self.key_of(a), self.key_of(b)) {
            (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
            (SortValue::Missing, _) => Ordering::Greater,
            (_, SortValue::Missing) => Ordering::Less,
            (ka, kb) => match self.direction {
                SortDirection::Ascending => ka.cmp(&kb),
                SortDirection::Descending => kb.cmp(&ka),
            },
        };
        by_key.then_with(|| a.entity_id().cmp(b.entity_id()))
    }
}
