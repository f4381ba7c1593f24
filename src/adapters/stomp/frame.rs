//! STOMP 1.2 frame codec.
//!
//! Frames travel as WebSocket text messages. A message may hold several
//! frames, and a message consisting only of end-of-line bytes is a
//! heart-beat.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Unknown STOMP command: {0}")]
    UnknownCommand(String),

    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    #[error("Invalid escape sequence in header: {0}")]
    InvalidEscape(String),

    #[error("Frame is not NUL-terminated")]
    MissingTerminator,

    #[error("Invalid content-length: {0}")]
    InvalidLength(String),

    #[error("Frame body is not UTF-8")]
    InvalidBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Client
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Disconnect,
    // Server
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    fn parse(raw: &str) -> Result<Self, FrameError> {
        Ok(match raw {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "DISCONNECT" => Command::Disconnect,
            "CONNECTED" => Command::Connected,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => return Err(FrameError::UnknownCommand(other.to_string())),
        })
    }

    /// CONNECT and CONNECTED headers are exempt from escaping.
    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Stomp | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of a header; the first occurrence wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the frame, adding `content-length` for non-empty bodies.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parses every frame in a WebSocket message. Heart-beats yield none.
    pub fn decode_all(input: &str) -> Result<Vec<Frame>, FrameError> {
        let bytes = input.as_bytes();
        let mut frames = Vec::new();
        let mut pos = 0;

        loop {
            while pos < bytes.len() && matches!(bytes[pos], b'\n' | b'\r') {
                pos += 1;
            }
            if pos >= bytes.len() {
                return Ok(frames);
            }
            let (frame, next) = decode_one(bytes, pos)?;
            frames.push(frame);
            pos = next;
        }
    }
}

fn read_line(bytes: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let end = bytes[start..].iter().position(|b| *b == b'\n')? + start;
    let line = &bytes[start..end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Some((line, end + 1))
}

fn utf8(bytes: &[u8]) -> Result<&str, FrameError> {
    std::str::from_utf8(bytes).map_err(|_| FrameError::InvalidBody)
}

fn decode_one(bytes: &[u8], start: usize) -> Result<(Frame, usize), FrameError> {
    let (line, mut pos) = read_line(bytes, start).ok_or(FrameError::MissingTerminator)?;
    let command = Command::parse(utf8(line)?)?;
    let unescape = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let (line, next) = read_line(bytes, pos).ok_or(FrameError::MissingTerminator)?;
        pos = next;
        if line.is_empty() {
            break;
        }
        let line = utf8(line)?;
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
        if unescape {
            headers.push((unescape_header(name)?, unescape_header(value)?));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    let declared = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .map(|(_, v)| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| FrameError::InvalidLength(v.clone()))
        })
        .transpose()?;

    let body_end = match declared {
        Some(len) => {
            let end = pos.checked_add(len).filter(|e| *e < bytes.len());
            match end {
                Some(end) if bytes[end] == 0 => end,
                _ => return Err(FrameError::InvalidLength(len.to_string())),
            }
        }
        None => {
            bytes[pos..]
                .iter()
                .position(|b| *b == 0)
                .ok_or(FrameError::MissingTerminator)?
                + pos
        }
    };

    let body = utf8(&bytes[pos..body_end])?.to_string();
    Ok((
        Frame {
            command,
            headers,
            body,
        },
        body_end + 1,
    ))
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}
