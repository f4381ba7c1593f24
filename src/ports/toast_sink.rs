//! ToastSink port - Transient, auto-dismissing UI messages.

use std::fmt;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastId(Uuid);

impl ToastId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ToastId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message shown for `lifetime` and then dismissed.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub level: ToastLevel,
    pub title: Option<String>,
    pub message: String,
    pub lifetime: Duration,
}

impl Toast {
    pub fn new(level: ToastLevel, message: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            id: ToastId::new(),
            level,
            title: None,
            message: message.into(),
            lifetime,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Rendering surface for toasts.
///
/// Both calls must return immediately; they run inside event delivery.
pub trait ToastSink: Send + Sync {
    fn show(&self, toast: &Toast);

    fn dismiss(&self, id: ToastId);
}
