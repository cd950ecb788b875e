//! # synckit-transport
//!
//! Binary/JSON wire framing, reconnection backoff, heartbeat liveness
//! tracking, and the bounded offline queue described in `spec.md` §4.5.
//! This crate knows nothing about CRDTs or documents — it carries opaque
//! `Frame`s between a replica and a sync server and is driven by whatever
//! sits above it (the `synckit` facade).

pub mod backoff;
pub mod connection;
pub mod frame;
pub mod heartbeat;
pub mod negotiation;
pub mod queue;

pub use backoff::ReconnectBackoff;
pub use connection::{Connection, ConnectionState};
pub use frame::{Frame, FrameType};
pub use heartbeat::HeartbeatMonitor;
pub use negotiation::{Negotiation, WireMode};
pub use queue::{OfflineQueue, QueuedItem};
