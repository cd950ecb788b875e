//! PN-Counter: a signed counter built from two grow-only counters
//! (`spec.md` §3). Each replica maintains its own increment and decrement
//! tallies; the visible value is `sum(increments) - sum(decrements)`.
//! Merge is per-client max on each side, so it's commutative, associative,
//! and idempotent exactly like the underlying G-Counters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use synckit_causality::VectorClock;
use synckit_core::{ClientId, LogicalTimestamp};

use crate::delta::{ChangeEvent, ChangeSet, Delta, DeltaKind};

#[derive(Debug, Serialize, Deserialize)]
struct MagnitudePayload {
    client_id: ClientId,
    amount: u64,
}

/// A grow-only per-client tally, merged by per-client max.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct GCounter {
    counts: BTreeMap<ClientId, u64>,
}

impl GCounter {
    fn value(&self) -> u64 {
        self.counts.values().sum()
    }

    fn set_at_least(&mut self, client_id: ClientId, value: u64) {
        let entry = self.counts.entry(client_id).or_insert(0);
        *entry = (*entry).max(value);
    }

    fn merge(&mut self, other: &Self) {
        for (client_id, &v) in &other.counts {
            self.set_at_least(client_id.clone(), v);
        }
    }
}

/// A PN-Counter: independent increment and decrement G-Counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnCounter {
    increments: GCounter,
    decrements: GCounter,
}

impl PnCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> i64 {
        self.increments.value() as i64 - self.decrements.value() as i64
    }

    /// Produce an `counterInc` delta incrementing by `amount` (this
    /// replica's cumulative increment tally after the operation).
    pub fn local_increment(&self, amount: u64, ts: LogicalTimestamp) -> Delta {
        let total = self.increments.counts.get(&ts.client_id).copied().unwrap_or(0) + amount;
        let vector = VectorClock::from_pairs([(ts.client_id.clone(), ts.counter)]);
        let payload = serde_json::to_value(MagnitudePayload {
            client_id: ts.client_id.clone(),
            amount: total,
        })
        .expect("MagnitudePayload always serializes");
        Delta::new(DeltaKind::CounterInc, payload, ts, vector)
    }

    pub fn local_decrement(&self, amount: u64, ts: LogicalTimestamp) -> Delta {
        let total = self.decrements.counts.get(&ts.client_id).copied().unwrap_or(0) + amount;
        let vector = VectorClock::from_pairs([(ts.client_id.clone(), ts.counter)]);
        let payload = serde_json::to_value(MagnitudePayload {
            client_id: ts.client_id.clone(),
            amount: total,
        })
        .expect("MagnitudePayload always serializes");
        Delta::new(DeltaKind::CounterDec, payload, ts, vector)
    }

    pub fn apply(&mut self, delta: &Delta) -> ChangeSet {
        let Ok(payload) = delta.decode::<MagnitudePayload>() else {
            return vec![ChangeEvent::NoOp];
        };
        match delta.kind {
            DeltaKind::CounterInc => {
                self.increments.set_at_least(payload.client_id, payload.amount);
            }
            DeltaKind::CounterDec => {
                self.decrements.set_at_least(payload.client_id, payload.amount);
            }
            _ => return vec![ChangeEvent::NoOp],
        }
        vec![ChangeEvent::CounterChanged { value: self.value() }]
    }

    /// Merge with another replica's state: per-client max on each side.
    pub fn merge(&mut self, other: &Self) {
        self.increments.merge(&other.increments);
        self.decrements.merge(&other.decrements);
    }

    pub fn snapshot(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("PnCounter always serializes")
    }

    pub fn load(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
