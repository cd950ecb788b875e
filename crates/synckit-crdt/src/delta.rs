//! The `Delta` envelope and `ChangeSet` notifications shared by every CRDT.
//!
//! A `Delta` is a self-describing change: `{ kind, payload, ts, vector }`
//! where `vector` is the producing replica's clock *after* the operation
//! (`spec.md` §3). The payload is kept as a `serde_json::Value` so the
//! transport layer can forward it without understanding its shape — only
//! the `kind` discriminator is inspected for dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use synckit_causality::VectorClock;
use synckit_core::LogicalTimestamp;

/// The operation kind a [`Delta`] carries. Mirrors the wire protocol's
/// dispatch discriminator (`spec.md` §4.5) one level up, at the CRDT layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeltaKind {
    SetField,
    DeleteField,
    TextInsert,
    TextDelete,
    FormatApply,
    SetAdd,
    SetRemove,
    CounterInc,
    CounterDec,
    ListMove,
}

/// A self-contained, applicable, immutable unit of change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    pub kind: DeltaKind,
    pub payload: Json,
    pub ts: LogicalTimestamp,
    pub vector: VectorClock,
}

impl Delta {
    pub fn new(kind: DeltaKind, payload: Json, ts: LogicalTimestamp, vector: VectorClock) -> Self {
        Self {
            kind,
            payload,
            ts,
            vector,
        }
    }

    /// Deserialize the payload into a specific kind-typed struct. Callers
    /// are expected to check `kind` first — this exists so each CRDT's
    /// `apply` can fail loudly (not silently ignore) a payload that
    /// doesn't match its own kind.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Schema-neutral description of what a CRDT's `apply` just did, so higher
/// layers (the sync coordinator's observers) can diff state without
/// understanding CRDT internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeEvent {
    FieldSet { name: String, value: Json },
    FieldDeleted { name: String },
    TextInserted { position: usize, text: String },
    TextDeleted { position: usize, length: usize },
    FormatApplied { start: usize, end: usize, attribute: String, value: Json },
    ElementAdded { value: Json },
    ElementRemoved { value: Json },
    CounterChanged { value: i64 },
    ItemMoved { key: String },
    /// `apply` determined the delta was already observed (duplicate
    /// `ts`) or had no visible effect; idempotent no-op.
    NoOp,
}

/// The ordered set of effects produced by one `apply` call.
pub type ChangeSet = Vec<ChangeEvent>;
