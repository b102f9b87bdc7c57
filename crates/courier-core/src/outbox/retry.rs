//! Retry policy: decides backoff delays between attempts.

use std::time::Duration;

use rand::Rng;

/// Backoff policy for the head-of-queue message.
///
/// Exponential: `base_delay * multiplier^(attempts - 1)`, capped at
/// `max_delay`, with a jitter fraction so a fleet of clients does not
/// hammer a recovering endpoint in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,

    /// Jitter fraction in `[0, 1)`; each delay is scaled by a uniform
    /// factor from `1 - jitter` to `1 + jitter`.
    pub jitter: f64,

    /// `None` means retry forever; a retryable failure then never drops
    /// a message.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(120),
            jitter: 0.1,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, given the number of failed
    /// attempts so far (1-indexed; 0 is treated as 1).
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1);
        let raw = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent as i32);
        let capped = raw.min(self.max_delay.as_secs_f64());
        let scaled = if self.jitter > 0.0 {
            let factor = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
            capped * (1.0 + factor)
        } else {
            capped
        };
        Duration::from_secs_f64(scaled.max(0.0))
    }

    /// Has this message used up its attempt budget?
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}
