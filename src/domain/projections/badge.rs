//! Unread notification badge.

use crate::domain::civic::Notification;

const BADGE_CAP: u64 = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadBadge {
    pub count: u64,
}

impl UnreadBadge {
    /// Text shown on the badge; `None` hides it.
    pub fn label(&self) -> Option<String> {
        match self.count {
            0 => None,
            n if n > BADGE_CAP => Some(format!("{}+", BADGE_CAP)),
            n => Some(n.to_string()),
        }
    }
}

/// Unread count: the server-reported figure when known, otherwise the
/// unread flags in the materialized window.
pub fn project_badge(notifications: &[Notification], reported: Option<u64>) -> UnreadBadge {
    let count = reported.unwrap_or_else(|| notifications.iter().filter(|n| !n.is_read).count() as u64);
    UnreadBadge { count }
}
