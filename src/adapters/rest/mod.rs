//! REST adapter for the civic backend.

mod client;
mod dto;

pub use client::{RestApiClient, RestClientConfig};
