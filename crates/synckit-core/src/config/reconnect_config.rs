use serde::{Deserialize, Serialize};

use super::defaults;

/// Exponential backoff parameters for transport reconnection.
///
/// `delay = min(max, initial * multiplier^attempt) * (1 + jitter(-j, j))`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Initial backoff delay in milliseconds.
    pub initial_millis: u64,
    /// Maximum backoff delay in milliseconds, regardless of attempt count.
    pub max_millis: u64,
    /// Multiplier applied to the delay on each successive attempt.
    pub multiplier: f64,
    /// Number of attempts before giving up and entering `Failed`.
    pub max_attempts: u32,
    /// Jitter fraction applied symmetrically around the computed delay.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_millis: defaults::DEFAULT_RECONNECT_INITIAL_MILLIS,
            max_millis: defaults::DEFAULT_RECONNECT_MAX_MILLIS,
            multiplier: defaults::DEFAULT_RECONNECT_MULTIPLIER,
            max_attempts: defaults::DEFAULT_RECONNECT_MAX_ATTEMPTS,
            jitter: defaults::DEFAULT_RECONNECT_JITTER,
        }
    }
}
