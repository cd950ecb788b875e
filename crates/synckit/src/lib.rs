//! # synckit
//!
//! The facade crate: a `Replica` root context (`spec.md` §9 Design Notes)
//! that wires the CRDT layer, causality layer, sync coordinator, and
//! transport together into the public API a host application actually
//! embeds. Re-exports everything a consumer needs so `use synckit::*`
//! covers the common case without reaching into the per-layer crates.

pub mod doc_handle;
pub mod replica;

pub use doc_handle::DocHandle;
pub use replica::Replica;

pub use synckit_core::config::{CrdtKind, SyncKitConfig};
pub use synckit_core::persistence::{DocumentRecord, Persistence};
pub use synckit_core::{ClientId, LogicalTimestamp, SyncKitError, SyncKitResult, Value};

pub use synckit_causality::{Comparison, SelectionOutcome, VectorClock};

pub use synckit_crdt::{ChangeEvent, ChangeSet, Delta, DeltaKind};

pub use synckit_sync::document::DocumentCrdt;
pub use synckit_sync::{AwarenessEntry, AwarenessMap, Observer};

pub use synckit_transport::{Connection, ConnectionState, Frame, FrameType};
