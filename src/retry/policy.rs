use std::time::Duration;

/// Retry limits, backoff and escalation factors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum submission attempts, at least one
    pub max_attempts: u32,
    /// Delay unit; the wait before attempt `k + 1` is `backoff_step * k`
    pub backoff_step: Duration,
    /// Gas price multiplier on escalation, in percent
    pub price_percent: u64,
    /// Gas limit multiplier on escalation, in percent
    pub limit_percent: u64,
    /// Deadline for a single submission call
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Creates a policy with the standard 100ms step and 1.2x / 1.5x escalation
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step: Duration::from_millis(100),
            price_percent: 120,
            limit_percent: 150,
            attempt_timeout: None,
        }
    }

    /// Policy for submissions that are tried exactly once
    pub fn single_attempt() -> Self {
        Self::new(1)
    }

    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    pub fn with_escalation(mut self, price_percent: u64, limit_percent: u64) -> Self {
        self.price_percent = price_percent;
        self.limit_percent = limit_percent;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Wait after failed attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}
