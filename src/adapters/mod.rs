//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - In-memory event bus
//! - `stomp` - STOMP-over-WebSocket live transport
//! - `sse` - Server-sent events live transport
//! - `rest` - reqwest client for the civic REST API
//! - `toast` - Toast sinks (in-memory, tracing)

pub mod events;
pub mod rest;
pub mod sse;
pub mod stomp;
pub mod toast;

pub use events::InMemoryEventBus;
pub use rest::{RestApiClient, RestClientConfig};
pub use sse::{SseStreamConfig, SseStreamTransport};
pub use stomp::{StompSocketConfig, StompSocketTransport};
pub use toast::{InMemoryToastSink, TracingToastSink};
