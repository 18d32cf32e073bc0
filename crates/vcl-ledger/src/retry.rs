//! Exponential backoff with jitter for block-claim retries.
//!
//! Contending writers that lost a claim all re-read the chain head at about
//! the same moment. Jitter spreads them out so the next round is not a
//! replay of the last one.

use std::time::Duration;

use rand::Rng;

/// Backoff schedule between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub initial_delay: Duration,
    /// Cap on the computed delay before jitter.
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction (0.0-1.0) of the delay randomly added or subtracted.
    pub jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(250),
            multiplier: 2.0,
            jitter: 0.5,
        }
    }
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            ..Self::default()
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jitter_range = capped * self.jitter;
        let delay = if jitter_range > 0.0 {
            let offset = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped + offset).max(0.0)
        } else {
            capped
        };
        Duration::from_secs_f64(delay)
    }
}
