//! LiveTransport port - Interface for the inbound live channels.
//!
//! A `LiveTransport` is a factory that opens one physical connection at a
//! time; the returned `LiveConnection` is owned exclusively by the channel
//! task driving it, so there is never more than one live connection per
//! channel.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::connection::Topic;
use crate::domain::foundation::{Credentials, DomainError, ErrorCode};

/// Errors raised by live transports. All of them are recoverable by
/// reconnecting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Handshake rejected: {0}")]
    Rejected(String),

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No traffic for {0:?}")]
    Silent(Duration),

    #[error("Operation not supported by {0}")]
    Unsupported(&'static str),
}

impl From<TransportError> for DomainError {
    fn from(err: TransportError) -> Self {
        let code = match err {
            TransportError::Closed(_) => ErrorCode::ChannelClosed,
            TransportError::Unsupported(_) => ErrorCode::Unsupported,
            _ => ErrorCode::TransportUnavailable,
        };
        DomainError::new(code, err.to_string())
    }
}

/// One application message received from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Topic destination (socket) or event name (stream).
    pub channel: String,
    /// Raw message body, expected to be JSON.
    pub body: String,
    /// Wire-level message id, when the protocol supplies one.
    pub message_id: Option<String>,
}

/// Anything read from a live connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(InboundMessage),
    /// Heartbeat or comment line; proves liveness, carries no data.
    KeepAlive,
}

/// Factory for connections of one kind.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Short name used in logs and connection-change events.
    fn name(&self) -> &'static str;

    /// Whether connections accept `send` and topic subscriptions.
    fn supports_send(&self) -> bool;

    /// Opens and authenticates a new connection.
    async fn open(&self, credentials: &Credentials) -> Result<Box<dyn LiveConnection>, TransportError>;
}

/// An open, authenticated connection.
///
/// `recv` must be cancel-safe: the channel task races it against commands
/// and drops the future when a command wins.
#[async_trait]
pub trait LiveConnection: Send {
    /// Starts receiving messages for a topic.
    async fn subscribe(&mut self, topic: &Topic) -> Result<(), TransportError>;

    /// Stops receiving messages for a topic.
    async fn unsubscribe(&mut self, topic: &Topic) -> Result<(), TransportError>;

    /// Sends a message to a destination.
    async fn send(&mut self, destination: &str, body: &str) -> Result<(), TransportError>;

    /// Next inbound item; `Ok(None)` when the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError>;

    /// Closes the connection. Safe to call more than once.
    async fn close(&mut self) -> Result<(), TransportError>;
}
