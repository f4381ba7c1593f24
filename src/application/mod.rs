//! Application layer - Stores, channels and handlers.
//!
//! This layer owns the mutable state (`SnapshotStore`), drives the live
//! channels and coordinates REST calls with live events through the
//! `LiveSync` facade.

mod debounce;
pub mod handlers;
mod live_channel;
mod live_sync;
mod map_refetch;
pub mod routing;
mod snapshot_store;

#[cfg(test)]
pub(crate) mod fakes;

pub use debounce::Debouncer;
pub use handlers::{NotificationDelivery, StatisticsRefresher, StoreSynchronizer};
pub use live_channel::{LiveChannel, LiveChannelConfig};
pub use live_sync::{LiveSync, LiveSyncDeps, LiveSyncSettings};
pub use map_refetch::MapRefetcher;
pub use routing::{MessageRouter, NotificationStreamRouter, TopicRouter};
pub use snapshot_store::{ComplaintMerge, NotificationMerge, SnapshotStore, StoreChange, StoreConfig};
