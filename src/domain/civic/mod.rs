//! Civic module - Typed views of the backend's complaint, notification,
//! and statistics shapes.
//!
//! Payloads are decoded leniently: the backend has shipped several field
//! spellings over time, nulls appear where values are expected, and unknown
//! fields are retained so nothing is lost on round-trip.

mod complaint;
mod map_bounds;
mod notification;
mod statistics;

pub use complaint::{
    ChangeAction, Complaint, ComplaintChange, ComplaintDraft, ComplaintFilter, ComplaintSort,
    ComplaintStatus,
};
pub use map_bounds::MapBounds;
pub use notification::{Notification, NotificationType};
pub use statistics::{AreaCount, StatisticsSnapshot};

use serde::{Deserialize, Deserializer};

/// Treats an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
