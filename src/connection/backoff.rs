//! Exponential reconnect backoff

use std::time::Duration;

use crate::config::BackoffConfig;

/// Floor for any reconnect delay
const MIN_DELAY_MS: u64 = 1;

/// Reconnect delay state for one connection manager.
///
/// The scheduled attempt waits [`delay`](Self::delay); right before it fires
/// the manager calls [`advance`](Self::advance), so the next failure waits
/// longer. With the defaults the observed sequence is 1s, 2s, 4s, 8s, 15s, 15s.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    factor: u32,
    current_delay_ms: u64,
}

impl BackoffPolicy {
    /// Build from config. The delay never drops below 1ms and the cap never
    /// below the initial delay, even for configs that skipped `validate()`.
    pub fn new(config: BackoffConfig) -> Self {
        let initial_delay_ms = config.initial_delay_ms.max(MIN_DELAY_MS);
        Self {
            initial_delay_ms,
            max_delay_ms: config.max_delay_ms.max(initial_delay_ms),
            factor: config.factor.max(1),
            current_delay_ms: initial_delay_ms,
        }
    }

    pub fn current_delay_ms(&self) -> u64 {
        self.current_delay_ms
    }

    /// Delay for the attempt being scheduled now
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.current_delay_ms.min(self.max_delay_ms))
    }

    /// Grow the delay for the next attempt, capped at the maximum
    pub fn advance(&mut self) {
        self.current_delay_ms = self
            .current_delay_ms
            .saturating_mul(u64::from(self.factor))
            .min(self.max_delay_ms);
    }

    /// Restore the initial delay after a successful open
    pub fn reset(&mut self) {
        self.current_delay_ms = self.initial_delay_ms;
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sequence_is_capped() {
        let mut backoff = BackoffPolicy::default();
        let mut observed = Vec::new();
        for _ in 0..7 {
            observed.push(backoff.delay().as_millis() as u64);
            backoff.advance();
        }
        assert_eq!(observed, vec![1000, 2000, 4000, 8000, 15000, 15000, 15000]);
    }

    #[test]
    fn test_reset_restores_initial_delay() {
        let mut backoff = BackoffPolicy::default();
        backoff.advance();
        backoff.advance();
        assert_eq!(backoff.current_delay_ms(), 4000);

        backoff.reset();
        assert_eq!(backoff.delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_delays_are_clamped() {
        let mut backoff = BackoffPolicy::new(BackoffConfig {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            factor: 0,
        });
        assert_eq!(backoff.delay(), Duration::from_millis(1));
        backoff.advance();
        assert_eq!(backoff.delay(), Duration::from_millis(1));
    }

    #[test]
    fn test_custom_config() {
        let mut backoff = BackoffPolicy::new(BackoffConfig {
            initial_delay_ms: 50,
            max_delay_ms: 120,
            factor: 3,
        });
        assert_eq!(backoff.delay(), Duration::from_millis(50));
        backoff.advance();
        assert_eq!(backoff.delay(), Duration::from_millis(120));
    }
}
