use serde::{Deserialize, Serialize};

use super::defaults;

/// Bounded FIFO offline queue parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of queued operations before `QueueFull` is returned.
    pub max_size: usize,
    /// Retries per item before it moves to the dead-letter slot.
    pub max_retries: u32,
    /// Initial per-item retry delay in milliseconds.
    pub retry_delay_millis: u64,
    /// Multiplier applied to the retry delay after each failed attempt.
    pub retry_backoff: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: defaults::DEFAULT_QUEUE_MAX_SIZE,
            max_retries: defaults::DEFAULT_QUEUE_MAX_RETRIES,
            retry_delay_millis: defaults::DEFAULT_QUEUE_RETRY_DELAY_MILLIS,
            retry_backoff: defaults::DEFAULT_QUEUE_RETRY_BACKOFF,
        }
    }
}
