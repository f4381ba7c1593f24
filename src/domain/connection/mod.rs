//! Connection module - Live channel lifecycle, backoff, and subscriptions.

mod backoff;
mod lifecycle;
mod state;
mod subscription;

pub use backoff::BackoffPolicy;
pub use lifecycle::{ConnectionLifecycle, ReconnectPolicy, RetryDecision, Transition};
pub use state::ConnectionState;
pub use subscription::{SubscriptionRegistry, Topic};
