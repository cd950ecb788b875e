//! Observed-Remove Set (OR-Set) with add-wins semantics (`spec.md` §4.2.4).
//!
//! Concurrent add and remove of the same element resolves to present: each
//! add creates a unique tag, and remove only tombstones the tags it
//! observed at the time. A concurrent add mints a fresh tag the remove
//! never saw, so it survives.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use synckit_core::{ClientId, LogicalTimestamp};

use crate::delta::{ChangeEvent, ChangeSet, Delta, DeltaKind};

/// A unique tag identifying a specific add operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UniqueTag {
    pub client_id: ClientId,
    pub seq: u64,
}

impl UniqueTag {
    fn from_ts(ts: &LogicalTimestamp) -> Self {
        Self {
            client_id: ts.client_id.clone(),
            seq: ts.counter,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AddPayload<T> {
    value: T,
    tag: UniqueTag,
}

#[derive(Debug, Serialize, Deserialize)]
struct RemovePayload {
    tags: BTreeSet<UniqueTag>,
}

/// An observed-remove set.
///
/// `BTreeMap`/`BTreeSet` (not `HashMap`/`HashSet`): two replicas that
/// converge to the same adds/tombstones must serialize identically for
/// snapshot round-trips to be stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrSet<T: Eq + Hash + Ord + Clone> {
    adds: BTreeMap<T, BTreeSet<UniqueTag>>,
    tombstones: BTreeSet<UniqueTag>,
}

impl<T: Eq + Hash + Ord + Clone> Default for OrSet<T> {
    fn default() -> Self {
        Self {
            adds: BTreeMap::new(),
            tombstones: BTreeSet::new(),
        }
    }
}

impl<T: Eq + Hash + Ord + Clone> OrSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present (non-tombstoned) elements.
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.adds
            .iter()
            .filter(|(_, tags)| tags.iter().any(|t| !self.tombstones.contains(t)))
            .map(|(value, _)| value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.adds
            .get(value)
            .is_some_and(|tags| tags.iter().any(|t| !self.tombstones.contains(t)))
    }

    pub fn len(&self) -> usize {
        self.elements().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_tagged(&mut self, value: T, tag: UniqueTag) {
        self.adds.entry(value).or_default().insert(tag);
    }

    fn remove_tags(&mut self, value: &T) -> BTreeSet<UniqueTag> {
        let observed = self.adds.get(value).cloned().unwrap_or_default();
        for tag in &observed {
            self.tombstones.insert(tag.clone());
        }
        observed
    }

    /// Merge with another replica's state: union of adds, union of
    /// tombstones. Idempotent, commutative, associative.
    pub fn merge(&mut self, other: &Self) {
        for (value, tags) in &other.adds {
            let entry = self.adds.entry(value.clone()).or_default();
            for tag in tags {
                entry.insert(tag.clone());
            }
        }
        for tag in &other.tombstones {
            self.tombstones.insert(tag.clone());
        }
    }
}

impl<T: Eq + Hash + Ord + Clone> PartialEq for OrSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.adds == other.adds && self.tombstones == other.tombstones
    }
}

impl<T: Eq + Hash + Ord + Clone> Eq for OrSet<T> {}

impl<T> OrSet<T>
where
    T: Eq + Hash + Ord + Clone + Serialize + DeserializeOwned,
{
    /// Produce a `setAdd` delta for a locally-initiated add.
    pub fn local_add(&self, value: T, ts: LogicalTimestamp) -> Delta {
        let tag = UniqueTag::from_ts(&ts);
        let vector = synckit_causality::VectorClock::from_pairs([(ts.client_id.clone(), ts.counter)]);
        let payload = serde_json::to_value(AddPayload { value, tag }).expect("AddPayload always serializes");
        Delta::new(DeltaKind::SetAdd, payload, ts, vector)
    }

    /// Produce a `setRemove` delta tombstoning every tag this replica has
    /// currently observed for `value`. A concurrent add on another replica
    /// mints a tag not in this set, so it is unaffected (add-wins).
    pub fn local_remove(&self, value: &T, ts: LogicalTimestamp) -> Delta {
        let tags: BTreeSet<UniqueTag> = self.adds.get(value).cloned().unwrap_or_default();
        let vector = synckit_causality::VectorClock::from_pairs([(ts.client_id.clone(), ts.counter)]);
        let payload = serde_json::to_value(RemovePayload { tags }).expect("RemovePayload always serializes");
        Delta::new(DeltaKind::SetRemove, payload, ts, vector)
    }

    pub fn apply(&mut self, delta: &Delta) -> ChangeSet
    where
        T: Serialize,
    {
        match delta.kind {
            DeltaKind::SetAdd => {
                let Ok(payload) = delta.decode::<AddPayload<T>>() else {
                    return vec![ChangeEvent::NoOp];
                };
                let json = serde_json::to_value(&payload.value).unwrap_or(serde_json::Value::Null);
                self.add_tagged(payload.value, payload.tag);
                vec![ChangeEvent::ElementAdded { value: json }]
            }
            DeltaKind::SetRemove => {
                let Ok(payload) = delta.decode::<RemovePayload>() else {
                    return vec![ChangeEvent::NoOp];
                };
                if payload.tags.is_empty() {
                    return vec![ChangeEvent::NoOp];
                }
                for tag in &payload.tags {
                    self.tombstones.insert(tag.clone());
                }
                vec![ChangeEvent::NoOp]
            }
            _ => vec![ChangeEvent::NoOp],
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("OrSet always serializes")
    }

    pub fn load(bytes: &[u8]) -> Result<Self, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(counter: u64, client: &str) -> LogicalTimestamp {
        LogicalTimestamp::new(counter, ClientId::from(client))
    }

    #[test]
    fn remove_then_add_is_present() {
        let mut set: OrSet<String> = OrSet::new();
        let add = set.local_add("x".to_string(), ts(1, "a"));
        set.apply(&add);
        assert!(set.contains(&"x".to_string()));

        let remove = set.local_remove(&"x".to_string(), ts(2, "a"));
        set.apply(&remove);
        assert!(!set.contains(&"x".to_string()));
    }

    // Concurrent add-wins: replica A adds "x", replica B concurrently
    // removes everything it has observed for "x" (nothing, since it never
    // saw A's add). Merging must leave "x" present.
    #[test]
    fn concurrent_add_wins_over_remove() {
        let mut replica_a: OrSet<String> = OrSet::new();
        let mut replica_b: OrSet<String> = OrSet::new();

        let add = replica_a.local_add("x".to_string(), ts(1, "a"));
        replica_a.apply(&add);

        // B never observed the add, so its remove tombstones nothing.
        let remove = replica_b.local_remove(&"x".to_string(), ts(1, "b"));
        replica_b.apply(&remove);

        replica_a.merge(&replica_b);
        replica_b.merge(&replica_a);

        assert!(replica_a.contains(&"x".to_string()));
        assert!(replica_b.contains(&"x".to_string()));
    }

    #[test]
    fn merge_is_commutative() {
        let mut replica_a: OrSet<String> = OrSet::new();
        let mut replica_b: OrSet<String> = OrSet::new();

        let add_x = replica_a.local_add("x".to_string(), ts(1, "a"));
        replica_a.apply(&add_x);
        let add_y = replica_b.local_add("y".to_string(), ts(1, "b"));
        replica_b.apply(&add_y);

        let mut order1 = replica_a.clone();
        order1.merge(&replica_b);
        let mut order2 = replica_b.clone();
        order2.merge(&replica_a);

        assert_eq!(order1, order2);
    }

    #[test]
    fn snapshot_round_trips() {
        let mut set: OrSet<String> = OrSet::new();
        let add = set.local_add("x".to_string(), ts(1, "a"));
        set.apply(&add);

        let bytes = set.snapshot();
        let restored: OrSet<String> = OrSet::load(&bytes).unwrap();
        assert_eq!(restored, set);
    }
}
