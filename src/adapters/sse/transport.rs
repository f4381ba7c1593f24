//! Server-sent events live transport.
//!
//! Receive-only: every dispatched event becomes an `InboundMessage` whose
//! channel is the SSE event name; comment lines are keep-alives.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, StatusCode, Url};
use std::collections::VecDeque;
use std::time::Duration;

use super::parser::{SseItem, SseParser};
use crate::domain::connection::Topic;
use crate::domain::foundation::Credentials;
use crate::ports::{Inbound, InboundMessage, LiveConnection, LiveTransport, TransportError};

const NAME: &str = "stream";

/// Settings for the stream transport.
#[derive(Debug, Clone)]
pub struct SseStreamConfig {
    /// Full `http(s)://` URL of the event stream.
    pub url: String,
    /// Bound on establishing the HTTP response; the body itself is unbounded.
    pub connect_timeout: Duration,
}

/// Opens long-lived `text/event-stream` responses.
pub struct SseStreamTransport {
    client: Client,
    url: Url,
}

impl SseStreamTransport {
    pub fn new(config: SseStreamConfig) -> Result<Self, TransportError> {
        let url = Url::parse(&config.url)
            .map_err(|e| TransportError::Connect(format!("invalid stream url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::Connect(format!(
                "stream url must use http or https, got {}",
                url.scheme()
            )));
        }
        // No overall timeout: the response body never ends.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl LiveTransport for SseStreamTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports_send(&self) -> bool {
        false
    }

    async fn open(&self, credentials: &Credentials) -> Result<Box<dyn LiveConnection>, TransportError> {
        let mut request = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(token) = credentials.token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransportError::Rejected(format!("stream refused ({})", status.as_u16())));
        }
        if !status.is_success() {
            return Err(TransportError::Connect(format!("stream request failed ({})", status.as_u16())));
        }

        tracing::debug!(url = %self.url.path(), "event stream opened");
        let body = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())).boxed();
        Ok(Box::new(SseConnection::new(body)))
    }
}

type ByteStream = BoxStream<'static, Result<Vec<u8>, reqwest::Error>>;

/// One open event stream.
struct SseConnection {
    body: Option<ByteStream>,
    parser: SseParser,
    pending: VecDeque<Inbound>,
}

impl SseConnection {
    fn new(body: ByteStream) -> Self {
        Self {
            body: Some(body),
            parser: SseParser::new(),
            pending: VecDeque::new(),
        }
    }

    fn absorb(&mut self, chunk: &[u8]) {
        for item in self.parser.push(chunk) {
            let inbound = match item {
                SseItem::Event(event) => Inbound::Message(InboundMessage {
                    channel: event.event,
                    body: event.data,
                    message_id: event.id,
                }),
                SseItem::Comment(_) => Inbound::KeepAlive,
            };
            self.pending.push_back(inbound);
        }
    }
}

#[async_trait]
impl LiveConnection for SseConnection {
    async fn subscribe(&mut self, _topic: &Topic) -> Result<(), TransportError> {
        Err(TransportError::Unsupported(NAME))
    }

    async fn unsubscribe(&mut self, _topic: &Topic) -> Result<(), TransportError> {
        Err(TransportError::Unsupported(NAME))
    }

    async fn send(&mut self, _destination: &str, _body: &str) -> Result<(), TransportError> {
        Err(TransportError::Unsupported(NAME))
    }

    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(Some(item));
            }
            let Some(body) = self.body.as_mut() else {
                return Ok(None);
            };
            match body.next().await {
                Some(Ok(chunk)) => self.absorb(&chunk),
                Some(Err(e)) => {
                    self.body = None;
                    return Err(TransportError::Closed(e.to_string()));
                }
                None => {
                    self.body = None;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the body aborts the underlying request.
        self.body = None;
        self.pending.clear();
        Ok(())
    }
}
