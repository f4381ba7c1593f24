//! Domain layer containing the synchronizer's types and pure logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, live events)
//! - `civic` - Complaint, notification and statistics shapes of the backend
//! - `snapshot` - Bounded, ordered windows and the upsert/remove merge
//! - `connection` - Reconnection state machine, backoff and topic registry
//! - `projections` - Pure view models derived from snapshots

pub mod civic;
pub mod connection;
pub mod foundation;
pub mod projections;
pub mod snapshot;
