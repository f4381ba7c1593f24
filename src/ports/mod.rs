//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing live events
//! - `EventSubscriber` - Port for subscribing to live events
//! - `EventHandler` - Handler that processes incoming events
//!
//! ## Live Channel Ports
//!
//! - `LiveTransport` - Opens authenticated socket or stream connections
//! - `LiveConnection` - One open connection, owned by its channel task
//!
//! ## Backend Ports
//!
//! - `ComplaintApi` / `NotificationApi` - REST endpoints
//!
//! ## UI Ports
//!
//! - `ToastSink` - Transient notifications

mod civic_api;
mod event_publisher;
mod event_subscriber;
mod live_transport;
mod toast_sink;

pub use civic_api::{ApiError, ComplaintApi, ComplaintQuery, MapQuery, NotificationApi, Page};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use live_transport::{Inbound, InboundMessage, LiveConnection, LiveTransport, TransportError};
pub use toast_sink::{Toast, ToastId, ToastLevel, ToastSink};
