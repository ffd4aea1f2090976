use std::time::Duration;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed,
    /// The delay doubles after each failed attempt.
    Exponential,
}

/// Retry behavior for a single task.
///
/// A task is invoked at most `max_retries + 1` times. `attempt_timeout`
/// bounds each invocation on its own; a timed-out attempt counts against the
/// retry budget like any other failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff: Backoff,
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_delay: Duration::from_secs(0),
            backoff: Backoff::Fixed,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, value: u32) -> Self {
        self.max_retries = value;
        self
    }

    pub fn with_retry_delay(mut self, value: Duration) -> Self {
        self.retry_delay = value;
        self
    }

    pub fn with_backoff(mut self, value: Backoff) -> Self {
        self.backoff = value;
        self
    }

    pub fn with_attempt_timeout(mut self, value: Duration) -> Self {
        self.attempt_timeout = Some(value);
        self
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.retry_delay,
            Backoff::Exponential => {
                let exponent = attempt.saturating_sub(1).min(31);
                self.retry_delay.saturating_mul(2u32.saturating_pow(exponent))
            }
        }
    }
}
