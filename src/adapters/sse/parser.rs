//! Incremental `text/event-stream` parser.
//!
//! Bytes arrive in arbitrary chunks; complete events are emitted as soon as
//! their terminating blank line has been seen.

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type; `message` when the stream did not name one.
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

/// Output of the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseItem {
    Event(SseEvent),
    /// `:`-prefixed line, used by servers as keep-alive.
    Comment(String),
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    started: bool,
    event: Option<String>,
    data: Option<String>,
    id: Option<String>,
    retry: Option<u64>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconnection delay most recently suggested by the server.
    pub fn retry_hint(&self) -> Option<u64> {
        self.retry
    }

    /// Feeds a chunk and returns everything it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseItem> {
        self.buffer.extend_from_slice(chunk);
        if !self.started && self.buffer.len() >= 3 {
            if self.buffer.starts_with(b"\xEF\xBB\xBF") {
                self.buffer.drain(..3);
            }
            self.started = true;
        }

        let mut items = Vec::new();
        let mut consumed = 0;
        while let Some((line_end, next)) = next_line(&self.buffer[consumed..]) {
            let line = String::from_utf8_lossy(&self.buffer[consumed..consumed + line_end]).into_owned();
            consumed += next;
            if let Some(item) = self.process_line(&line) {
                items.push(item);
            }
        }
        self.buffer.drain(..consumed);
        items
    }

    fn process_line(&mut self, line: &str) -> Option<SseItem> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(comment) = line.strip_prefix(':') {
            return Some(SseItem::Comment(comment.trim_start().to_string()));
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.retry = Some(ms);
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseItem> {
        let event = self.event.take();
        let data = self.data.take()?;
        Some(SseItem::Event(SseEvent {
            event: event.filter(|e| !e.is_empty()).unwrap_or_else(|| "message".to_string()),
            data,
            id: self.id.clone(),
        }))
    }
}

/// Finds the first complete line: `(content_len, bytes_to_consume)`.
///
/// A trailing lone `\r` is left unconsumed because the `\n` of a `\r\n`
/// pair may arrive in the next chunk.
fn next_line(buf: &[u8]) -> Option<(usize, usize)> {
    let pos = buf.iter().position(|b| *b == b'\n' || *b == b'\r')?;
    if buf[pos] == b'\n' {
        return Some((pos, pos + 1));
    }
    match buf.get(pos + 1) {
        Some(b'\n') => Some((pos, pos + 2)),
        Some(_) => Some((pos, pos + 1)),
        None => None,
    }
}
