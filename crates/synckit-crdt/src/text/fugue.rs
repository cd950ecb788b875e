//! Positional text CRDT, Fugue-style (`spec.md` §4.2.2).
//!
//! Every character is a node carrying the id of its left and right
//! neighbors *at insertion time* (`leftOrigin`/`rightOrigin`). Deletes only
//! tombstone nodes — garbage collection is out of scope for v1, so causal
//! correctness never depends on a node that might have been reclaimed.
//!
//! Integration: every character produced by one `local_insert` call is a
//! *run* — chained left-to-right against its immediate predecessor for
//! positioning, but tagged with the run's original `(leftOrigin,
//! rightOrigin)` gap (`origin_left_root`/`right_origin`, constant across
//! the whole run) and the id of the run's first character (`run_head`).
//! Two runs are concurrent siblings exactly when they share a gap; the run
//! with the smaller `run_head` wins and is placed *entirely* before the
//! other, so scanning only ever needs to compare run heads, never
//! individual chain members, to keep each author's run contiguous instead
//! of interleaved character-by-character. A node from an unrelated gap
//! (nested deeper by a later insert between two already-placed
//! characters) is simply stepped over — it was already resolved relative
//! to its own neighbors and can't compete with `node` for position.

use serde::{Deserialize, Serialize};

use synckit_causality::VectorClock;
use synckit_core::{ClientId, LogicalTimestamp};

use crate::delta::{ChangeEvent, ChangeSet, Delta, DeltaKind};

/// A character's origin anchor: one of the two document-boundary
/// sentinels, or a concrete character id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Sentinel for "before the first character" (`spec.md` §9).
    DocStart,
    Char(LogicalTimestamp),
    /// Sentinel for "after the last character".
    DocEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CharNode {
    id: LogicalTimestamp,
    value: char,
    left_origin: Origin,
    right_origin: Origin,
    /// The `leftOrigin` originally given to this node's whole run (constant
    /// across every character the run produced), not the chained immediate
    /// predecessor carried in `left_origin`. Together with `right_origin`
    /// this identifies the contested gap two concurrent runs share.
    origin_left_root: Origin,
    /// Id of the first character in this node's run. Constant across the
    /// run; used to order whole concurrent runs against each other.
    run_head: LogicalTimestamp,
    deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct InsertPayload {
    left_origin: Origin,
    right_origin: Origin,
    start_counter: u64,
    client_id: ClientId,
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DeletePayload {
    ids: Vec<LogicalTimestamp>,
}

/// A Fugue text CRDT: an ordered sequence of (possibly tombstoned)
/// character nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextCrdt {
    nodes: Vec<CharNode>,
}

impl TextCrdt {
    pub fn new() -> Self {
        Self::default()
    }

    /// The visible (non-tombstoned) text, in document order.
    pub fn to_string(&self) -> String {
        self.nodes.iter().filter(|n| !n.deleted).map(|n| n.value).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.nodes.iter().filter(|n| !n.deleted).count()
    }

    /// Ids of the visible characters, in document order — the sequence
    /// `synckit_crdt::richtext` resolves formatting spans against.
    pub fn visible_ids(&self) -> Vec<LogicalTimestamp> {
        self.nodes.iter().filter(|n| !n.deleted).map(|n| n.id.clone()).collect()
    }

    fn origin_at_visible(&self, visible_index: usize) -> Origin {
        self.nodes
            .iter()
            .filter(|n| !n.deleted)
            .nth(visible_index)
            .map(|n| Origin::Char(n.id.clone()))
            .unwrap_or(Origin::DocEnd)
    }

    fn position_of(&self, origin: &Origin) -> Option<usize> {
        match origin {
            Origin::DocStart => None,
            Origin::DocEnd => Some(self.nodes.len()),
            Origin::Char(id) => self.nodes.iter().position(|n| &n.id == id),
        }
    }

    /// Produce a `textInsert` delta inserting `text` at visible `index`.
    /// Every character in `text` takes a consecutive counter starting at
    /// `start_ts.counter`, all from `start_ts.client_id` — the whole batch
    /// is one local tick's worth of change.
    pub fn local_insert(&self, index: usize, text: &str, start_ts: LogicalTimestamp) -> Delta {
        let left_origin = if index == 0 {
            Origin::DocStart
        } else {
            self.origin_at_visible(index - 1)
        };
        let right_origin = self.origin_at_visible(index);

        let char_count = text.chars().count() as u64;
        let end_counter = start_ts.counter + char_count.saturating_sub(1);
        let vector = VectorClock::from_pairs([(start_ts.client_id.clone(), end_counter)]);

        let payload = serde_json::to_value(InsertPayload {
            left_origin,
            right_origin,
            start_counter: start_ts.counter,
            client_id: start_ts.client_id.clone(),
            text: text.to_string(),
        })
        .expect("InsertPayload always serializes");

        Delta::new(DeltaKind::TextInsert, payload, start_ts, vector)
    }

    /// Produce a `textDelete` delta tombstoning the visible characters in
    /// `[index, index + length)`.
    pub fn local_delete(&self, index: usize, length: usize, ts: LogicalTimestamp) -> Delta {
        let ids: Vec<LogicalTimestamp> = self
            .nodes
            .iter()
            .filter(|n| !n.deleted)
            .skip(index)
            .take(length)
            .map(|n| n.id.clone())
            .collect();
        let vector = VectorClock::from_pairs([(ts.client_id.clone(), ts.counter)]);
        let payload = serde_json::to_value(DeletePayload { ids }).expect("DeletePayload always serializes");
        Delta::new(DeltaKind::TextDelete, payload, ts, vector)
    }

    fn insert_node(&mut self, node: CharNode) -> usize {
        let left_pos = self.position_of(&node.left_origin).map(|p| p + 1).unwrap_or(0);
        let right_pos = self.position_of(&node.right_origin).unwrap_or(self.nodes.len());

        let mut at = left_pos;
        while at < right_pos {
            let existing = &self.nodes[at];
            let same_gap = existing.origin_left_root == node.origin_left_root && existing.right_origin == node.right_origin;
            if same_gap && existing.run_head > node.run_head {
                // existing's run has lower priority than node's run: stop
                // here so node's whole run lands before existing's entirely.
                break;
            }
            // Either existing's run shares the gap and wins the tie (skip
            // past it and the rest of its run), or existing belongs to an
            // unrelated, already-resolved gap nested inside this one (skip
            // over it too — it can't compete with node for position).
            at += 1;
        }

        self.nodes.insert(at, node);
        at
    }

    fn visible_index_of(&self, node_index: usize) -> usize {
        self.nodes[..node_index].iter().filter(|n| !n.deleted).count()
    }

    pub fn apply(&mut self, delta: &Delta) -> ChangeSet {
        match delta.kind {
            DeltaKind::TextInsert => {
                let Ok(payload) = delta.decode::<InsertPayload>() else {
                    return vec![ChangeEvent::NoOp];
                };
                let origin_left_root = payload.left_origin.clone();
                let run_head = LogicalTimestamp::new(payload.start_counter, payload.client_id.clone());
                let mut left_origin = payload.left_origin;
                let mut events = Vec::new();
                for (i, ch) in payload.text.chars().enumerate() {
                    let id = LogicalTimestamp::new(payload.start_counter + i as u64, payload.client_id.clone());
                    if self.nodes.iter().any(|n| n.id == id) {
                        continue; // already applied (idempotence)
                    }
                    let node = CharNode {
                        id: id.clone(),
                        value: ch,
                        left_origin: left_origin.clone(),
                        right_origin: payload.right_origin.clone(),
                        origin_left_root: origin_left_root.clone(),
                        run_head: run_head.clone(),
                        deleted: false,
                    };
                    let node_index = self.insert_node(node);
                    events.push(ChangeEvent::TextInserted {
                        position: self.visible_index_of(node_index),
                        text: ch.to_string(),
                    });
                    left_origin = Origin::Char(id);
                }
                if events.is_empty() {
                    vec![ChangeEvent::NoOp]
                } else {
                    events
                }
            }
            DeltaKind::TextDelete => {
                let Ok(payload) = delta.decode::<DeletePayload>() else {
                    return vec![ChangeEvent::NoOp];
                };
                let mut events = Vec::new();
                for id in payload.ids {
                    if let Some(idx) = self.nodes.iter().position(|n| n.id == id) {
                        if !self.nodes[idx].deleted {
                            let position = self.visible_index_of(idx);
                            self.nodes[idx].deleted = true;
                            events.push(ChangeEvent::TextDeleted { position, length: 1 });
                        }
                    }
                }
                if events.is_empty() {
                    vec![ChangeEvent::NoOp]
                } else {
                    events
                }
            }
            _ => vec![ChangeEvent::NoOp],
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("TextCrdt always serializes")
    }

    pub fn load(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(s: &str) -> ClientId {
        ClientId::from(s)
    }

    #[test]
    fn sequential_inserts_produce_expected_string() {
        let mut doc = TextCrdt::new();
        let hello = doc.local_insert(0, "hello", LogicalTimestamp::new(1, cid("a")));
        doc.apply(&hello);
        let world = doc.local_insert(5, " world", LogicalTimestamp::new(10, cid("a")));
        doc.apply(&world);
        assert_eq!(doc.to_string(), "hello world");
    }

    #[test]
    fn delete_tombstones_without_shifting_ids() {
        let mut doc = TextCrdt::new();
        let insert = doc.local_insert(0, "hello", LogicalTimestamp::new(1, cid("a")));
        doc.apply(&insert);
        let delete = doc.local_delete(1, 3, LogicalTimestamp::new(10, cid("a")));
        doc.apply(&delete);
        assert_eq!(doc.to_string(), "ho");
    }

    // spec.md §8: concurrent inserts at the same position must not
    // interleave and must converge identically regardless of delivery order.
    #[test]
    fn concurrent_inserts_at_same_position_converge_without_interleaving() {
        let mut base = TextCrdt::new();
        let seed = base.local_insert(0, "ac", LogicalTimestamp::new(1, cid("a")));
        base.apply(&seed);

        let mut replica_a = base.clone();
        let mut replica_b = base.clone();

        // Both insert "B"/"X" between 'a' and 'c' concurrently.
        let insert_a = replica_a.local_insert(1, "BB", LogicalTimestamp::new(1, cid("alice")));
        replica_a.apply(&insert_a);
        let insert_b = replica_b.local_insert(1, "XX", LogicalTimestamp::new(1, cid("bob")));
        replica_b.apply(&insert_b);

        // Deliver in both orders.
        let mut order1 = replica_a.clone();
        order1.apply(&insert_b);
        let mut order2 = replica_b.clone();
        order2.apply(&insert_a);

        assert_eq!(order1.to_string(), order2.to_string());
        // Non-interleaving: each author's run of characters stays contiguous.
        let s = order1.to_string();
        assert!(s.contains("BB"));
        assert!(s.contains("XX"));
    }

    #[test]
    fn apply_is_idempotent() {
        let mut doc = TextCrdt::new();
        let insert = doc.local_insert(0, "hi", LogicalTimestamp::new(1, cid("a")));
        doc.apply(&insert);
        doc.apply(&insert);
        assert_eq!(doc.to_string(), "hi");
    }

    #[test]
    fn snapshot_round_trips() {
        let mut doc = TextCrdt::new();
        let insert = doc.local_insert(0, "abc", LogicalTimestamp::new(1, cid("a")));
        doc.apply(&insert);
        let bytes = doc.snapshot();
        let restored = TextCrdt::load(&bytes).unwrap();
        assert_eq!(restored.to_string(), doc.to_string());
    }
}
