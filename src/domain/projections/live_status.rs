//! "Live updates" indicator derived from channel states.

use crate::domain::connection::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    /// Every started channel is connected.
    Live,
    /// First connection in progress.
    Connecting,
    /// A channel dropped and is retrying; data may be stale.
    Paused,
    /// Nothing connected, or a channel gave up.
    Offline,
}

impl LiveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LiveStatus::Live => "Live",
            LiveStatus::Connecting => "Connecting…",
            LiveStatus::Paused => "Live updates paused",
            LiveStatus::Offline => "Offline",
        }
    }
}

/// Combines the states of all channels into one indicator.
pub fn project_live_status(states: &[ConnectionState]) -> LiveStatus {
    use ConnectionState::*;

    if states.iter().all(|s| *s == Disconnected) || states.contains(&Failed) {
        LiveStatus::Offline
    } else if states.contains(&Reconnecting) {
        LiveStatus::Paused
    } else if states.contains(&Connecting) {
        LiveStatus::Connecting
    } else {
        LiveStatus::Live
    }
}
