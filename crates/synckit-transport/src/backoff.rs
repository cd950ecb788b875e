//! Reconnection backoff (`spec.md` §4.5):
//!
//! `delay = min(maxDelay, initialDelay × multiplier^attempt) × (1 + rand(-j, j))`
//!
//! `attempt` is 0-indexed (the first reconnect attempt after a drop uses
//! `attempt = 0`). Once `attempt >= maxAttempts` the connection gives up
//! and surfaces `ConnectionFailed` rather than computing a further delay.

use std::time::Duration;

use rand::Rng;

use synckit_core::config::ReconnectConfig;
use synckit_core::SyncKitError;

/// Tracks the reconnect attempt counter for one connection and computes
/// each attempt's backoff delay.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    config: ReconnectConfig,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Resets the attempt counter; called once a connection succeeds.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The delay before the next reconnect attempt, advancing the internal
    /// counter. Returns `ConnectionFailed` once `maxAttempts` is exhausted
    /// — the caller should stop retrying and surface the error upward.
    pub fn next_delay(&mut self) -> Result<Duration, SyncKitError> {
        if self.attempt >= self.config.max_attempts {
            return Err(SyncKitError::ConnectionFailed(format!(
                "exhausted {} reconnect attempts",
                self.config.max_attempts
            )));
        }
        let delay = self.compute_delay(self.attempt, &mut rand::thread_rng());
        self.attempt += 1;
        Ok(delay)
    }

    /// Delay calculation split out from attempt-counter mutation so it can
    /// be tested deterministically with a seeded RNG.
    fn compute_delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let base = self.config.initial_millis as f64 * self.config.multiplier.powi(attempt as i32);
        let capped = base.min(self.config.max_millis as f64);
        let jitter_fraction = rng.gen_range(-self.config.jitter..=self.config.jitter);
        let jittered = (capped * (1.0 + jitter_fraction)).max(0.0);
        Duration::from_millis(jittered.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReconnectConfig {
        ReconnectConfig {
            initial_millis: 1000,
            max_millis: 30_000,
            multiplier: 1.5,
            max_attempts: 8,
            jitter: 0.1,
        }
    }

    #[test]
    fn delay_grows_with_attempt_and_stays_within_jitter_band() {
        let backoff = ReconnectBackoff::new(config());
        for attempt in 0..8 {
            let base = 1000f64 * 1.5f64.powi(attempt as i32);
            let capped = base.min(30_000.0);
            let lo = (capped * 0.9).floor() as u64;
            let hi = (capped * 1.1).ceil() as u64;
            let mut rng = rand::thread_rng();
            let delay = backoff.compute_delay(attempt, &mut rng).as_millis() as u64;
            assert!(delay >= lo && delay <= hi, "attempt {attempt}: {delay} not in [{lo}, {hi}]");
        }
    }

    #[test]
    fn delay_never_exceeds_max_millis_even_with_positive_jitter() {
        let backoff = ReconnectBackoff::new(config());
        let mut rng = rand::thread_rng();
        // At high attempt counts, base alone would far exceed max_millis.
        let delay = backoff.compute_delay(20, &mut rng).as_millis() as u64;
        assert!(delay <= (30_000.0 * 1.1) as u64);
    }

    #[test]
    fn next_delay_advances_attempt_counter_and_fails_after_max_attempts() {
        let mut backoff = ReconnectBackoff::new(config());
        for _ in 0..8 {
            backoff.next_delay().unwrap();
        }
        let err = backoff.next_delay().unwrap_err();
        assert!(matches!(err, SyncKitError::ConnectionFailed(_)));
    }

    #[test]
    fn reset_allows_further_attempts() {
        let mut backoff = ReconnectBackoff::new(config());
        for _ in 0..8 {
            backoff.next_delay().unwrap();
        }
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert!(backoff.next_delay().is_ok());
    }
}
