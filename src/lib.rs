//! Civic Live Sync - Real-time view synchronizer for civic complaints
//!
//! This crate keeps an eventually-consistent, in-memory view of complaints,
//! notifications and statistics by merging paginated REST snapshots with
//! updates arriving over a STOMP socket and a server-sent event stream.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
