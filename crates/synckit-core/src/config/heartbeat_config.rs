use serde::{Deserialize, Serialize};

use super::defaults;

/// Heartbeat cadence for an active transport connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Seconds between PING frames.
    pub interval_secs: u64,
    /// Seconds to wait for a PONG before treating the connection as dead.
    pub timeout_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::DEFAULT_HEARTBEAT_INTERVAL_SECS,
            timeout_secs: defaults::DEFAULT_HEARTBEAT_TIMEOUT_SECS,
        }
    }
}
