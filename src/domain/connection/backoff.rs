//! Delay strategy between reconnection attempts.

use std::time::Duration;

/// Delay before the next connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Constant delay between attempts.
    Fixed { interval: Duration },
    /// Doubling delay starting at `base`, capped at `ceiling`.
    Exponential { base: Duration, ceiling: Duration },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed {
            interval: Duration::from_millis(5_000),
        }
    }
}

impl BackoffPolicy {
    /// Delay after the `attempt`-th consecutive failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffPolicy::Fixed { interval } => interval,
            BackoffPolicy::Exponential { base, ceiling } => {
                let exponent = attempt.saturating_sub(1).min(31);
                base.checked_mul(1u32 << exponent)
                    .unwrap_or(ceiling)
                    .min(ceiling)
            }
        }
    }
}
