//! STOMP-over-WebSocket live transport.
//!
//! Authentication happens once per connection: the token is appended to the
//! socket URL as `?token=` and repeated as an `Authorization` header on the
//! CONNECT frame.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::frame::{Command, Frame};
use crate::domain::connection::Topic;
use crate::domain::foundation::Credentials;
use crate::ports::{Inbound, InboundMessage, LiveConnection, LiveTransport, TransportError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Settings for the socket transport.
#[derive(Debug, Clone)]
pub struct StompSocketConfig {
    /// `ws://` or `wss://` endpoint.
    pub url: String,
    /// Bound on the WebSocket upgrade plus the CONNECT/CONNECTED exchange.
    pub connect_timeout: Duration,
    /// Server heart-beat interval to request, if any.
    pub server_heartbeat: Option<Duration>,
}

/// Opens STOMP sessions over WebSocket.
pub struct StompSocketTransport {
    config: StompSocketConfig,
}

impl StompSocketTransport {
    pub fn new(config: StompSocketConfig) -> Result<Self, TransportError> {
        let url = Url::parse(&config.url)
            .map_err(|e| TransportError::Connect(format!("invalid socket url: {}", e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TransportError::Connect(format!(
                "socket url must use ws or wss, got {}",
                url.scheme()
            )));
        }
        Ok(Self { config })
    }

    fn endpoint(&self, credentials: &Credentials) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.config.url)
            .map_err(|e| TransportError::Connect(format!("invalid socket url: {}", e)))?;
        if let Some(token) = credentials.token() {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    fn connect_frame(&self, url: &Url, credentials: &Credentials) -> Frame {
        let heartbeat = self
            .config
            .server_heartbeat
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|| "0".to_string());
        let mut frame = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", url.host_str().unwrap_or("localhost"))
            .header("heart-beat", format!("0,{}", heartbeat));
        if let Some(value) = credentials.authorization_header() {
            frame = frame.header("Authorization", value);
        }
        frame
    }

    async fn handshake(&self, credentials: &Credentials) -> Result<Socket, TransportError> {
        let url = self.endpoint(credentials)?;
        let (mut ws, _response) = connect_async(url.as_str()).await.map_err(|e| match e {
            tokio_tungstenite::tungstenite::Error::Http(response) => {
                let status = response.status().as_u16();
                match status {
                    401 | 403 => TransportError::Rejected(format!("socket upgrade refused ({})", status)),
                    _ => TransportError::Connect(format!("socket upgrade failed ({})", status)),
                }
            }
            other => TransportError::Connect(other.to_string()),
        })?;

        let connect = self.connect_frame(&url, credentials);
        ws.send(Message::Text(connect.encode()))
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        loop {
            let message = ws
                .next()
                .await
                .ok_or_else(|| TransportError::Closed("socket closed during handshake".into()))?
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            let text = match message {
                Message::Text(text) => text,
                Message::Binary(data) => String::from_utf8_lossy(&data).into_owned(),
                Message::Close(_) => {
                    return Err(TransportError::Closed("socket closed during handshake".into()))
                }
                _ => continue,
            };
            let frames =
                Frame::decode_all(&text).map_err(|e| TransportError::Protocol(e.to_string()))?;
            for frame in frames {
                match frame.command {
                    Command::Connected => {
                        tracing::debug!(
                            version = frame.get("version").unwrap_or("1.2"),
                            server = frame.get("server").unwrap_or("unknown"),
                            "stomp session established"
                        );
                        return Ok(ws);
                    }
                    Command::Error => {
                        let reason = frame.get("message").unwrap_or(&frame.body).to_string();
                        return Err(TransportError::Rejected(reason));
                    }
                    other => {
                        tracing::debug!(command = %other, "ignoring frame before CONNECTED");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl LiveTransport for StompSocketTransport {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn supports_send(&self) -> bool {
        true
    }

    async fn open(&self, credentials: &Credentials) -> Result<Box<dyn LiveConnection>, TransportError> {
        let timeout = self.config.connect_timeout;
        let ws = tokio::time::timeout(timeout, self.handshake(credentials))
            .await
            .map_err(|_| TransportError::Connect(format!("handshake timed out after {:?}", timeout)))??;
        Ok(Box::new(StompConnection::new(ws)))
    }
}

/// One STOMP session.
struct StompConnection {
    ws: Socket,
    subscriptions: HashMap<Topic, String>,
    next_subscription: u64,
    pending: VecDeque<Inbound>,
    closed: bool,
}

impl StompConnection {
    fn new(ws: Socket) -> Self {
        Self {
            ws,
            subscriptions: HashMap::new(),
            next_subscription: 0,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    async fn write(&mut self, frame: Frame) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed("session already closed".into()));
        }
        self.ws
            .send(Message::Text(frame.encode()))
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }

    fn absorb(&mut self, text: &str) -> Result<(), TransportError> {
        let frames = match Frame::decode_all(text) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable stomp frame");
                return Ok(());
            }
        };
        if frames.is_empty() {
            self.pending.push_back(Inbound::KeepAlive);
        }
        for frame in frames {
            match frame.command {
                Command::Message => {
                    let channel = frame.get("destination").unwrap_or_default().to_string();
                    let message_id = frame.get("message-id").map(str::to_string);
                    self.pending.push_back(Inbound::Message(InboundMessage {
                        channel,
                        body: frame.body,
                        message_id,
                    }));
                }
                Command::Error => {
                    let reason = frame.get("message").unwrap_or(&frame.body).to_string();
                    return Err(TransportError::Protocol(reason));
                }
                other => {
                    tracing::debug!(command = %other, "ignoring stomp frame");
                    self.pending.push_back(Inbound::KeepAlive);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LiveConnection for StompConnection {
    async fn subscribe(&mut self, topic: &Topic) -> Result<(), TransportError> {
        if self.subscriptions.contains_key(topic) {
            return Ok(());
        }
        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;
        let frame = Frame::new(Command::Subscribe)
            .header("id", id.clone())
            .header("destination", topic.as_str())
            .header("ack", "auto");
        self.write(frame).await?;
        self.subscriptions.insert(topic.clone(), id);
        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &Topic) -> Result<(), TransportError> {
        let Some(id) = self.subscriptions.remove(topic) else {
            return Ok(());
        };
        self.write(Frame::new(Command::Unsubscribe).header("id", id)).await
    }

    async fn send(&mut self, destination: &str, body: &str) -> Result<(), TransportError> {
        let frame = Frame::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .body(body);
        self.write(frame).await
    }

    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(Some(item));
            }
            if self.closed {
                return Ok(None);
            }
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => self.absorb(&text)?,
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    self.absorb(&text)?;
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = self.ws.send(Message::Pong(payload)).await;
                    self.pending.push_back(Inbound::KeepAlive);
                }
                Some(Ok(Message::Pong(_))) => self.pending.push_back(Inbound::KeepAlive),
                Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "server closed socket".to_string());
                    tracing::debug!(reason = %reason, "socket closed by peer");
                    self.closed = true;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Err(TransportError::Closed(e.to_string()));
                }
                None => {
                    self.closed = true;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        let _ = self
            .ws
            .send(Message::Text(Frame::new(Command::Disconnect).encode()))
            .await;
        self.closed = true;
        self.subscriptions.clear();
        self.ws
            .close(None)
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(url: &str) -> Result<StompSocketTransport, TransportError> {
        StompSocketTransport::new(StompSocketConfig {
            url: url.to_string(),
            connect_timeout: Duration::from_secs(1),
            server_heartbeat: Some(Duration::from_secs(10)),
        })
    }

    #[test]
    fn rejects_non_websocket_urls() {
        assert!(transport("http://localhost/ws").is_err());
        assert!(transport("not a url").is_err());
    }

    #[test]
    fn endpoint_carries_token_query() {
        let t = transport("ws://localhost:8080/ws").unwrap();
        let url = t.endpoint(&Credentials::bearer("abc def")).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/ws?token=abc+def");
    }

    #[test]
    fn anonymous_endpoint_has_no_query() {
        let t = transport("ws://localhost:8080/ws").unwrap();
        let url = t.endpoint(&Credentials::anonymous()).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn connect_frame_carries_authorization_and_heartbeat() {
        let t = transport("wss://civic.example/ws").unwrap();
        let url = t.endpoint(&Credentials::bearer("tok")).unwrap();
        let frame = t.connect_frame(&url, &Credentials::bearer("tok"));
        assert_eq!(frame.get("accept-version"), Some("1.2"));
        assert_eq!(frame.get("host"), Some("civic.example"));
        assert_eq!(frame.get("heart-beat"), Some("0,10000"));
        assert_eq!(frame.get("Authorization"), Some("Bearer tok"));
    }
}
