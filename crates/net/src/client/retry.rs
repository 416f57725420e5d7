use std::time::Duration;

/// How often, and how patiently, a client retries a failed connect.
///
/// The delay doubles after every failed attempt, starting at `initial_delay` and capped at
/// `max_delay`. Only I/O failures are retried; a rejected TLS handshake is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that tries exactly once.
    pub fn never() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Total attempts, the first one included. Zero is treated as one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// The pause after the `failed`-th failed attempt, counting from one.
    pub fn delay_for(&self, failed: u32) -> Duration {
        let doublings = failed.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1 << doublings).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay: Duration::from_millis(100), max_delay: Duration::from_secs(5) }
    }
}
