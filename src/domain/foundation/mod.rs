//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the live event envelope, and error
//! types that form the vocabulary of the synchronizer.

mod credentials;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use credentials::Credentials;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{EventId, EventKind, EventSource, LiveEvent};
pub use ids::{EntityId, SubscriptionId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
