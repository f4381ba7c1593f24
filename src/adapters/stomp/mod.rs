//! STOMP socket adapter.
//!
//! - `frame` - STOMP 1.2 codec
//! - `StompSocketTransport` - `LiveTransport` over tokio-tungstenite

mod frame;
mod transport;

pub use frame::{Command, Frame, FrameError};
pub use transport::{StompSocketConfig, StompSocketTransport};
