use serde::{Deserialize, Serialize};

use super::defaults;

/// Presence/awareness expiry parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwarenessConfig {
    /// Seconds of inactivity before an awareness entry expires.
    pub inactivity_timeout_secs: u64,
}

impl Default for AwarenessConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: defaults::DEFAULT_AWARENESS_INACTIVITY_TIMEOUT_SECS,
        }
    }
}
