//! Named default constants, referenced from every `*_config.rs` file so a
//! reader can find every tunable's default in one place.

// Reconnection (spec.md §4.5)
pub const DEFAULT_RECONNECT_INITIAL_MILLIS: u64 = 1_000;
pub const DEFAULT_RECONNECT_MAX_MILLIS: u64 = 30_000;
pub const DEFAULT_RECONNECT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 8;
pub const DEFAULT_RECONNECT_JITTER: f64 = 0.1;

// Heartbeat (spec.md §4.5)
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 5;

// Offline queue (spec.md §4.5)
pub const DEFAULT_QUEUE_MAX_SIZE: usize = 1_000;
pub const DEFAULT_QUEUE_MAX_RETRIES: u32 = 5;
pub const DEFAULT_QUEUE_RETRY_DELAY_MILLIS: u64 = 500;
pub const DEFAULT_QUEUE_RETRY_BACKOFF: f64 = 2.0;

// Awareness (spec.md §4.6)
pub const DEFAULT_AWARENESS_INACTIVITY_TIMEOUT_SECS: u64 = 30;

// Timeouts (spec.md §5)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SYNC_REQUEST_TIMEOUT_SECS: u64 = 60;
