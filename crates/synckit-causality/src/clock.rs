//! Vector clock for causal ordering.
//!
//! Each client maintains its own logical clock entry. Used both for
//! conflict resolution inside the CRDT layer and for delta selection
//! ("which operations does this peer not yet have?").
//!
//! # Examples
//!
//! ```
//! use synckit_causality::VectorClock;
//! use synckit_core::ClientId;
//!
//! let mut a = VectorClock::new();
//! a.set(ClientId::from("a"), 2);
//!
//! let mut b = VectorClock::new();
//! b.set(ClientId::from("b"), 1);
//!
//! assert!(a.concurrent_with(&b));
//!
//! a.merge(&b);
//! assert_eq!(a.get(&ClientId::from("a")), 2);
//! assert_eq!(a.get(&ClientId::from("b")), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use synckit_core::ClientId;

/// Four-way comparison result between two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Before,
    After,
    Equal,
    Concurrent,
}

/// A vector clock mapping client ids to logical counters.
///
/// Partial order: `A ≤ B` iff every entry of `A` is ≤ the corresponding
/// entry of `B` (missing entries are 0). Merge is componentwise max.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    // BTreeMap, not HashMap: two equal clocks must serialize identically
    // so a persisted snapshot's clock bytes are reproducible.
    counters: BTreeMap<ClientId, u64>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clock directly from `(client, counter)` pairs, e.g. when
    /// rehydrating a [`synckit_core::persistence::DocumentRecord`].
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ClientId, u64)>) -> Self {
        Self {
            counters: pairs.into_iter().collect(),
        }
    }

    pub fn to_pairs(&self) -> Vec<(ClientId, u64)> {
        self.counters
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Increment the entry for `client_id` by 1 and return the new value.
    pub fn increment(&mut self, client_id: &ClientId) -> u64 {
        let entry = self.counters.entry(client_id.clone()).or_insert(0);
        *entry = entry.checked_add(1).expect("vector clock counter overflow");
        *entry
    }

    /// Force the entry for `client_id` to an explicit value (never lowers
    /// it — merging a smaller value into a clock would violate monotonicity).
    pub fn set(&mut self, client_id: ClientId, value: u64) {
        let entry = self.counters.entry(client_id).or_insert(0);
        *entry = (*entry).max(value);
    }

    /// Current counter value for a client (0 if absent).
    pub fn get(&self, client_id: &ClientId) -> u64 {
        self.counters.get(client_id).copied().unwrap_or(0)
    }

    /// Merge with another clock: componentwise max. Idempotent, commutative,
    /// associative.
    pub fn merge(&mut self, other: &Self) {
        for (client_id, &other_val) in &other.counters {
            let entry = self.counters.entry(client_id.clone()).or_insert(0);
            *entry = (*entry).max(other_val);
        }
    }

    /// `self ≤ other`: every entry in `self` is ≤ the corresponding entry
    /// in `other`.
    pub fn le(&self, other: &Self) -> bool {
        self.counters
            .iter()
            .all(|(client_id, &v)| v <= other.get(client_id))
    }

    /// `self < other`: `self ≤ other` and `self != other`.
    pub fn happens_before(&self, other: &Self) -> bool {
        self.le(other) && self != other
    }

    /// Neither clock happens-before the other.
    pub fn concurrent_with(&self, other: &Self) -> bool {
        !self.happens_before(other) && !other.happens_before(self)
    }

    /// Four-way comparison, used by delta selection and conflict
    /// resolution call sites that want a single match instead of three
    /// boolean checks.
    pub fn compare(&self, other: &Self) -> Comparison {
        if self == other {
            Comparison::Equal
        } else if self.le(other) {
            Comparison::Before
        } else if other.le(self) {
            Comparison::After
        } else {
            Comparison::Concurrent
        }
    }

    /// All client ids with a nonzero entry.
    pub fn clients(&self) -> impl Iterator<Item = &ClientId> {
        self.counters.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Returns, for each client id present in `self` or `remote`, the
    /// half-open `(low, high]` range of counters present in `self` but not
    /// in `remote` — i.e. what `remote` is missing from `self`.
    ///
    /// An empty map for a client means `remote` already has everything
    /// `self` has for that client.
    pub fn missing_ranges(&self, remote: &Self) -> BTreeMap<ClientId, (u64, u64)> {
        let mut ranges = BTreeMap::new();
        for (client_id, &self_val) in &self.counters {
            let remote_val = remote.get(client_id);
            if self_val > remote_val {
                ranges.insert(client_id.clone(), (remote_val, self_val));
            }
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(s: &str) -> ClientId {
        ClientId::from(s)
    }

    #[test]
    fn merge_is_componentwise_max() {
        let mut a = VectorClock::new();
        a.set(cid("a"), 5);
        a.set(cid("b"), 1);

        let mut b = VectorClock::new();
        b.set(cid("a"), 3);
        b.set(cid("b"), 3);
        b.set(cid("c"), 2);

        a.merge(&b);
        assert_eq!(a.get(&cid("a")), 5);
        assert_eq!(a.get(&cid("b")), 3);
        assert_eq!(a.get(&cid("c")), 2);
    }

    #[test]
    fn concurrent_clocks_are_detected() {
        let mut a = VectorClock::new();
        a.set(cid("a"), 1);
        let mut b = VectorClock::new();
        b.set(cid("b"), 1);
        assert_eq!(a.compare(&b), Comparison::Concurrent);
        assert!(a.concurrent_with(&b));
    }

    #[test]
    fn equal_clocks_are_equal() {
        let mut a = VectorClock::new();
        a.set(cid("a"), 1);
        let mut b = VectorClock::new();
        b.set(cid("a"), 1);
        assert_eq!(a.compare(&b), Comparison::Equal);
        assert!(!a.concurrent_with(&b));
    }

    #[test]
    fn dominance_is_strict() {
        let mut a = VectorClock::new();
        a.set(cid("a"), 2);
        let mut b = VectorClock::new();
        b.set(cid("a"), 1);
        assert_eq!(a.compare(&b), Comparison::After);
        assert_eq!(b.compare(&a), Comparison::Before);
        assert!(b.happens_before(&a));
    }

    // spec.md §8 S2: delta-selection scenario.
    #[test]
    fn scenario_s2_vector_clock_delta_selection() {
        let mut a = VectorClock::new();
        a.set(cid("a"), 5);
        a.set(cid("b"), 3);

        let mut b = VectorClock::new();
        b.set(cid("a"), 3);
        b.set(cid("b"), 3);
        b.set(cid("c"), 1);

        // B needs A's "a" counters in (3,5]
        let b_needs = a.missing_ranges(&b);
        assert_eq!(b_needs.get(&cid("a")), Some(&(3, 5)));
        assert!(!b_needs.contains_key(&cid("b")));

        // A needs B's "c" counters in (0,1]
        let a_needs = b.missing_ranges(&a);
        assert_eq!(a_needs.get(&cid("c")), Some(&(0, 1)));

        // applying those ranges converges both to {a:5, b:3, c:1}
        let mut converged_a = a.clone();
        converged_a.merge(&b);
        let mut converged_b = b.clone();
        converged_b.merge(&a);
        assert_eq!(converged_a, converged_b);
        assert_eq!(converged_a.get(&cid("a")), 5);
        assert_eq!(converged_a.get(&cid("b")), 3);
        assert_eq!(converged_a.get(&cid("c")), 1);
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn counter_overflow_is_fatal() {
        let mut a = VectorClock::new();
        a.set(cid("a"), u64::MAX);
        a.increment(&cid("a"));
    }
}
