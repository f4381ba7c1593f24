//! Application handlers.
//!
//! Event bus consumers. Each one declares the event kinds it expects so the
//! facade can register it without knowing its internals.

mod notification_delivery;
mod statistics_refresh;
mod store_sync;

pub use notification_delivery::{NotificationDelivery, DELIVERY_KINDS};
pub use statistics_refresh::{StatisticsRefresher, REFRESH_KINDS};
pub use store_sync::{StoreSynchronizer, STORE_SYNC_KINDS};
