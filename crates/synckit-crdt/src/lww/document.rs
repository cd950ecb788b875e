//! LWW document: a flat record where every field resolves independently by
//! last-writer-wins (`spec.md` §4.2.1).
//!
//! Tie-break: when two updates carry the same counter (only possible for
//! different clients — a single client's own counters are strictly
//! increasing), the lexicographically greater `ClientId` wins. Tombstones
//! are retained: a deleted field keeps its entry with `deleted = true`
//! rather than being removed from the map, so a late-arriving older update
//! can never resurrect it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use synckit_causality::VectorClock;
use synckit_core::{ClientId, LogicalTimestamp, Value};

use crate::delta::{ChangeEvent, ChangeSet, Delta, DeltaKind};

/// One field's last-writer-wins entry.
///
/// Invariant: `ts` is always ≥ the timestamp of any update ever applied to
/// this field — enforced by `merge_in` only ever moving forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LwwEntry {
    pub value: Value,
    pub ts: LogicalTimestamp,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct SetFieldPayload {
    name: String,
    value: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct DeleteFieldPayload {
    name: String,
}

/// A mapping from field name to LWW entry, plus the vector clock
/// summarizing the latest counter per contributing client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LwwDocument {
    fields: BTreeMap<String, LwwEntry>,
    clock: VectorClock,
}

impl LwwDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a field, or `None` if never set or tombstoned.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|e| !e.deleted).map(|e| &e.value)
    }

    /// All live (non-tombstoned) fields.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(_, e)| !e.deleted).map(|(k, e)| (k, &e.value))
    }

    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    /// Produce a `setField` delta for the local replica. Does not apply it
    /// to `self` — callers apply their own locally-produced deltas through
    /// the same `apply` path as remote ones, so there is exactly one code
    /// path that enforces the LWW rule.
    pub fn local_set(&self, name: impl Into<String>, value: Value, ts: LogicalTimestamp) -> Delta {
        let mut vector = self.clock.clone();
        vector.set(ts.client_id.clone(), ts.counter);
        let payload = serde_json::to_value(SetFieldPayload {
            name: name.into(),
            value,
        })
        .expect("SetFieldPayload always serializes");
        Delta::new(DeltaKind::SetField, payload, ts, vector)
    }

    /// Produce a `deleteField` delta for the local replica.
    pub fn local_delete(&self, name: impl Into<String>, ts: LogicalTimestamp) -> Delta {
        let mut vector = self.clock.clone();
        vector.set(ts.client_id.clone(), ts.counter);
        let payload = serde_json::to_value(DeleteFieldPayload { name: name.into() })
            .expect("DeleteFieldPayload always serializes");
        Delta::new(DeltaKind::DeleteField, payload, ts, vector)
    }

    /// Apply a delta (local or remote) under the LWW rule. Applying the
    /// same delta twice is a no-op (idempotence); applying deltas for the
    /// same field in either order converges to the same state
    /// (commutativity, since the rule only ever compares `ts`).
    pub fn apply(&mut self, delta: &Delta) -> ChangeSet {
        self.clock.set(delta.ts.client_id.clone(), delta.ts.counter);

        match delta.kind {
            DeltaKind::SetField => {
                let Ok(payload) = delta.decode::<SetFieldPayload>() else {
                    return vec![ChangeEvent::NoOp];
                };
                self.apply_entry(payload.name, payload.value, delta.ts.clone(), false)
            }
            DeltaKind::DeleteField => {
                let Ok(payload) = delta.decode::<DeleteFieldPayload>() else {
                    return vec![ChangeEvent::NoOp];
                };
                self.apply_entry(payload.name, Value::Null, delta.ts.clone(), true)
            }
            _ => vec![ChangeEvent::NoOp],
        }
    }

    fn apply_entry(&mut self, name: String, value: Value, ts: LogicalTimestamp, deleted: bool) -> ChangeSet {
        let wins = match self.fields.get(&name) {
            None => true,
            Some(existing) => ts > existing.ts,
        };
        if !wins {
            return vec![ChangeEvent::NoOp];
        }

        self.fields.insert(
            name.clone(),
            LwwEntry {
                value: value.clone(),
                ts,
                deleted,
            },
        );

        if deleted {
            vec![ChangeEvent::FieldDeleted { name }]
        } else {
            vec![ChangeEvent::FieldSet {
                name,
                value: json!(value),
            }]
        }
    }

    /// Serialize full state for persistence/transfer.
    pub fn snapshot(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("LwwDocument always serializes")
    }

    /// Rehydrate from a snapshot produced by `snapshot()`.
    pub fn load(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    #[cfg(test)]
    pub(crate) fn field_ts(&self, name: &str) -> Option<&LogicalTimestamp> {
        self.fields.get(name).map(|e| &e.ts)
    }
}
