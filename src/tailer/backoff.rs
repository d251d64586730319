use crate::config::types::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Delay schedule for consecutive poll failures.
///
/// The n-th consecutive failure waits `min(initial * multiplier^(n-1), max)`. With jitter the
/// wait is drawn uniformly from the upper half of that range, which keeps many tailers hitting
/// the same endpoint from retrying in lockstep.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    multiplier: f64,
    max: Duration,
    jitter: bool,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            initial: config.initial,
            multiplier: config.multiplier.max(1.0),
            max: config.max.max(config.initial),
            jitter: config.jitter,
            attempts: 0,
        }
    }

    /// Consecutive failures recorded since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        let delay = self.base_delay(self.attempts);
        if self.jitter && !delay.is_zero() {
            let half = delay / 2;
            let spread = rand::rng().random_range(0.0..=1.0);
            half + half.mul_f64(spread)
        } else {
            delay
        }
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.powi(exponent);
        let nanos = self.initial.as_nanos() as f64 * factor;
        if !nanos.is_finite() || nanos >= self.max.as_nanos() as f64 {
            self.max
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }
}
