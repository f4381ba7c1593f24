//! Server-sent events adapter.

mod parser;
mod transport;

pub use parser::{SseEvent, SseItem, SseParser};
pub use transport::{SseStreamConfig, SseStreamTransport};
