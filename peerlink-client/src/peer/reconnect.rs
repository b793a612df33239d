use std::time::Duration;

/// Linear backoff for signaling reconnects: attempt `n` waits `base_delay * n`.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    max_retries: u32,
    base_delay: Duration,
    attempts: u32,
}

impl ReconnectBackoff {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once `max_retries` attempts were handed out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_retries {
            return None;
        }
        self.attempts += 1;
        Some(self.base_delay * self.attempts)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
