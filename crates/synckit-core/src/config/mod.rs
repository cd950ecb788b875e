//! Configuration for a SyncKit replica (`spec.md` §6).
//!
//! Every option is optional, backed by `#[serde(default)]` and the named
//! constants in [`defaults`]. Loadable from TOML for host applications,
//! constructible directly for library embedders.

pub mod awareness_config;
pub mod crdt_config;
pub mod defaults;
pub mod heartbeat_config;
pub mod queue_config;
pub mod reconnect_config;

pub use awareness_config::AwarenessConfig;
pub use crdt_config::{CrdtConfig, CrdtKind};
pub use heartbeat_config::HeartbeatConfig;
pub use queue_config::QueueConfig;
pub use reconnect_config::ReconnectConfig;

use serde::{Deserialize, Serialize};

use crate::error::{SyncKitError, SyncKitResult};

/// Top-level replica configuration.
///
/// `client_id` and `server_url` are left as `Option<String>` rather than
/// the strong `ClientId` type: this struct is the deserialization target
/// for host-supplied TOML/JSON, where the id hasn't been validated yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncKitConfig {
    /// Override the auto-generated replica id. Absent = generate one.
    pub client_id: Option<String>,
    /// Enables remote sync when present; absent = offline-only.
    pub server_url: Option<String>,
    pub reconnect: ReconnectConfig,
    pub heartbeat: HeartbeatConfig,
    pub queue: QueueConfig,
    pub awareness: AwarenessConfig,
    pub crdts: CrdtConfig,
}

impl Default for SyncKitConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            server_url: None,
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            queue: QueueConfig::default(),
            awareness: AwarenessConfig::default(),
            crdts: CrdtConfig::default(),
        }
    }
}

impl SyncKitConfig {
    /// Parse configuration from a TOML document.
    pub fn from_toml(text: &str) -> SyncKitResult<Self> {
        toml::from_str(text).map_err(|e| SyncKitError::ProtocolError(format!("invalid config: {e}")))
    }

    /// Whether remote sync is enabled for this configuration.
    pub fn is_online(&self) -> bool {
        self.server_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_offline() {
        let cfg = SyncKitConfig::default();
        assert!(!cfg.is_online());
        assert_eq!(cfg.reconnect.max_attempts, 8);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = SyncKitConfig::from_toml(
            r#"
            server_url = "wss://example.test/sync"

            [reconnect]
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert!(cfg.is_online());
        assert_eq!(cfg.reconnect.max_attempts, 3);
        // untouched fields keep their defaults
        assert_eq!(cfg.heartbeat.interval_secs, 30);
    }
}
