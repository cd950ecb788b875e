//! The error taxonomy surfaced externally.
//!
//! These are *kinds*, not exception hierarchies: transport errors recover
//! locally where possible, CRDT-layer errors never crash the process, and
//! anything the caller must know about comes through a single observable
//! error channel per coordinator. A fatal internal invariant violation
//! (counter overflow) aborts the process instead of returning a `Result` —
//! those are unreachable under correct use and are not part of this enum.

use thiserror::Error;

/// The standard result type for fallible SyncKit operations.
pub type SyncKitResult<T> = Result<T, SyncKitError>;

/// Error kinds surfaced externally, per `spec.md` §7.
#[derive(Debug, Error)]
pub enum SyncKitError {
    /// Transport could not establish a connection; recoverable via
    /// reconnection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost; recoverable via reconnection.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Authentication failed. Terminal for this connection — no reconnect.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A local operation was rejected because the offline queue is full.
    #[error("offline queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// A network operation exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A remote delta was inconsistent with the locally known causal
    /// history; the delta is dropped and logged, not applied.
    #[error("causal violation: delta vector {delta_vector} not reachable from {local_vector}")]
    CausalViolation {
        local_vector: String,
        delta_vector: String,
    },

    /// Informational: the peer's delta log was truncated below what this
    /// replica needs, so a full snapshot was sent instead. The receiver
    /// must rebind observers after loading it.
    #[error("snapshot reset for document {0}")]
    SnapshotReset(String),

    /// A persistence write failed; the coordinator retries with backoff.
    #[error("persistence write failed: {0}")]
    PersistenceFailed(String),

    /// Persistence has failed repeatedly past the retry threshold; state
    /// remains correct in memory but is not durable.
    #[error("persistence lost for document {0} after {attempts} attempts")]
    PersistenceLost { document: String, attempts: u32 },

    /// The operation was attempted on a coordinator or transport that has
    /// already been closed.
    #[error("operation on closed {0}")]
    Closed(&'static str),

    /// A malformed frame was received; the connection to that peer should
    /// be closed.
    #[error("protocol error: {0}")]
    ProtocolError(String),
}

impl SyncKitError {
    /// Whether this error kind is recoverable by the transport's own
    /// reconnection state machine, without surfacing to the caller as
    /// terminal.
    pub fn is_transport_recoverable(&self) -> bool {
        matches!(
            self,
            SyncKitError::ConnectionFailed(_) | SyncKitError::ConnectionLost(_) | SyncKitError::Timeout(_)
        )
    }
}
