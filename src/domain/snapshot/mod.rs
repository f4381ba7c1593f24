//! Snapshot module - Generic windowed collections merged from REST pages
//! and live events.

mod entity;
mod singleton;
mod sort;
mod window;

pub use entity::{EntityKind, TrackedEntity};
pub use singleton::SingletonSlot;
pub use sort::{SortDirection, SortSpec, SortValue};
pub use window::{Admission, SnapshotWindow, UpsertOutcome, WindowSnapshot};
