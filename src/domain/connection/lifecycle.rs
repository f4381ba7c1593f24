//! Reconnection state machine for one live channel.
//!
//! `ConnectionLifecycle` is pure bookkeeping: it decides which state comes
//! next and how long to wait, while the owning channel task performs the I/O
//! and sleeps. `attempt` counts consecutive failures since the last
//! successful connect or manual `connect()`.

use std::time::Duration;

use super::{BackoffPolicy, ConnectionState};
use crate::domain::foundation::{StateMachine, ValidationError};

/// Bounds on reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// A state change, reported so it can be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub attempt: u32,
}

/// What to do while `Reconnecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    attempt: u32,
    connect_attempts: u32,
    policy: ReconnectPolicy,
}

impl ConnectionLifecycle {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            connect_attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive failures since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Times `Connecting` was entered since the last manual connect.
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// External connect request.
    ///
    /// No-op (returns `None`) while a connection exists or is being
    /// established; from `Disconnected` or `Failed` it resets the counters.
    pub fn connect(&mut self) -> Option<Transition> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Failed => {
                self.attempt = 0;
                self.connect_attempts = 0;
                self.move_to(ConnectionState::Connecting).ok()
            }
            _ => None,
        }
    }

    /// The transport handshake succeeded.
    pub fn on_connected(&mut self) -> Result<Transition, ValidationError> {
        let transition = self.move_to(ConnectionState::Connected)?;
        self.attempt = 0;
        Ok(Transition {
            attempt: 0,
            ..transition
        })
    }

    /// The transport failed to open or dropped after opening.
    pub fn on_transport_failure(&mut self) -> Result<Transition, ValidationError> {
        self.state.transition_to(ConnectionState::Reconnecting)?;
        self.attempt = self.attempt.saturating_add(1);
        self.move_to(ConnectionState::Reconnecting)
    }

    /// Whether another attempt is allowed, and after which delay.
    pub fn retry_decision(&self) -> RetryDecision {
        if self.attempt >= self.policy.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.policy.backoff.delay(self.attempt))
        }
    }

    /// Backoff elapsed; try again.
    pub fn retry(&mut self) -> Result<Transition, ValidationError> {
        if self.state != ConnectionState::Reconnecting {
            return Err(ValidationError::invalid_format(
                "state_transition",
                format!("retry requested while {:?}", self.state),
            ));
        }
        if self.attempt >= self.policy.max_attempts {
            return Err(ValidationError::out_of_range(
                "attempt",
                0,
                i64::from(self.policy.max_attempts),
                i64::from(self.attempt),
            ));
        }
        self.move_to(ConnectionState::Connecting)
    }

    /// Retry budget exhausted.
    pub fn give_up(&mut self) -> Result<Transition, ValidationError> {
        self.move_to(ConnectionState::Failed)
    }

    /// Explicit disconnect; cancels any pending retry.
    pub fn disconnect(&mut self) -> Option<Transition> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        self.attempt = 0;
        self.move_to(ConnectionState::Disconnected).ok()
    }

    fn move_to(&mut self, target: ConnectionState) -> Result<Transition, ValidationError> {
        let from = self.state;
        self.state = from.transition_to(target)?;
        if target == ConnectionState::Connecting {
            self.connect_attempts = self.connect_attempts.saturating_add(1);
        }
        Ok(Transition {
            from,
            to: target,
            attempt: self.attempt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle(max_attempts: u32) -> ConnectionLifecycle {
        ConnectionLifecycle::new(ReconnectPolicy {
            max_attempts,
            backoff: BackoffPolicy::Fixed {
                interval: Duration::from_millis(10),
            },
        })
    }

    /// Drives failures until the lifecycle stops retrying, recording states.
    fn fail_until_settled(lc: &mut ConnectionLifecycle) -> Vec<ConnectionState> {
        let mut seen = Vec::new();
        loop {
            seen.push(lc.on_transport_failure().unwrap().to);
            match lc.retry_decision() {
                RetryDecision::RetryAfter(_) => {
                    lc.retry().unwrap();
                }
                RetryDecision::GiveUp => {
                    seen.push(lc.give_up().unwrap().to);
                    return seen;
                }
            }
        }
    }

    #[test]
    fn three_failures_with_max_three_reach_failed() {
        use ConnectionState::*;
        let mut lc = lifecycle(3);
        lc.connect().unwrap();

        let states = fail_until_settled(&mut lc);

        assert_eq!(states, vec![Reconnecting, Reconnecting, Reconnecting, Failed]);
        assert_eq!(lc.connect_attempts(), 3);
    }

    #[test]
    fn manual_connect_after_failed_resets_attempts() {
        let mut lc = lifecycle(3);
        lc.connect().unwrap();
        fail_until_settled(&mut lc);
        assert_eq!(lc.attempt(), 3);

        let t = lc.connect().unwrap();

        assert_eq!(t.from, ConnectionState::Failed);
        assert_eq!(t.to, ConnectionState::Connecting);
        assert_eq!(lc.attempt(), 0);
        assert_eq!(lc.connect_attempts(), 1);
    }

    #[test]
    fn connect_is_a_no_op_while_connecting_or_connected() {
        let mut lc = lifecycle(3);
        lc.connect().unwrap();
        assert!(lc.connect().is_none());
        lc.on_connected().unwrap();
        assert!(lc.connect().is_none());
        assert_eq!(lc.state(), ConnectionState::Connected);
    }

    #[test]
    fn success_resets_attempt_counter() {
        let mut lc = lifecycle(3);
        lc.connect().unwrap();
        lc.on_transport_failure().unwrap();
        lc.retry().unwrap();
        lc.on_transport_failure().unwrap();
        lc.retry().unwrap();
        assert_eq!(lc.attempt(), 2);

        lc.on_connected().unwrap();

        assert_eq!(lc.attempt(), 0);
    }

    #[test]
    fn drop_after_connected_counts_as_failure() {
        let mut lc = lifecycle(1);
        lc.connect().unwrap();
        lc.on_connected().unwrap();

        let t = lc.on_transport_failure().unwrap();

        assert_eq!(t.from, ConnectionState::Connected);
        assert_eq!(t.attempt, 1);
        assert_eq!(lc.retry_decision(), RetryDecision::GiveUp);
    }

    #[test]
    fn retry_beyond_budget_is_rejected() {
        let mut lc = lifecycle(1);
        lc.connect().unwrap();
        lc.on_transport_failure().unwrap();
        assert!(lc.retry().is_err());
        assert_eq!(lc.state(), ConnectionState::Reconnecting);
    }

    #[test]
    fn retry_outside_reconnecting_is_rejected() {
        let mut lc = lifecycle(3);
        lc.connect().unwrap();
        lc.on_connected().unwrap();
        assert!(lc.retry().is_err());
        assert_eq!(lc.state(), ConnectionState::Connected);
    }

    #[test]
    fn disconnect_cancels_reconnection() {
        let mut lc = lifecycle(3);
        lc.connect().unwrap();
        lc.on_transport_failure().unwrap();

        let t = lc.disconnect().unwrap();

        assert_eq!(t.to, ConnectionState::Disconnected);
        assert_eq!(lc.attempt(), 0);
        assert!(lc.disconnect().is_none());
    }

    #[test]
    fn failure_while_disconnected_is_invalid() {
        let mut lc = lifecycle(3);
        assert!(lc.on_transport_failure().is_err());
        assert_eq!(lc.attempt(), 0);
    }
}
