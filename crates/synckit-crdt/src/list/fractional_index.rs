//! Fractional-index ordered list (`spec.md` §3, §4.2.4).
//!
//! Each list item carries a sortable string key. `between(a, b)` produces a
//! key `k` with `a < k < b` under plain lexicographic string order, so
//! reordering an item only touches its own key — never its neighbors'.
//! Two replicas independently calling `between` on the same `(a, b)` would
//! otherwise risk generating the same key; every generated key is suffixed
//! with the producing `ClientId` to rule that out (`spec.md` §9 Open
//! Questions, resolved in `SPEC_FULL.md`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use synckit_causality::VectorClock;
use synckit_core::{ClientId, LogicalTimestamp, Value};

use crate::delta::{ChangeEvent, ChangeSet, Delta, DeltaKind};

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const BASE: u32 = 36;
// Must sort before every `ALPHABET` character ('0' = 0x30): a digit string
// that's a strict prefix of another is the smaller key (the shorter one's
// "missing" trailing digits act as the smallest possible continuation), and
// the separator has to preserve that when the client-id suffix is appended.
const KEY_SEPARATOR: char = '!';

fn digit_value(c: u8) -> u32 {
    match c {
        b'0'..=b'9' => (c - b'0') as u32,
        b'a'..=b'z' => (c - b'a' + 10) as u32,
        _ => 0,
    }
}

fn digit_char(v: u32) -> u8 {
    ALPHABET[(v % BASE) as usize]
}

/// Generate a digit sequence strictly between `lo` (default: start of the
/// key space) and `hi` (default: no upper bound).
fn digits_between(lo: &[u8], hi: Option<&[u8]>) -> Vec<u8> {
    let mut result = Vec::new();
    let mut i = 0;
    let mut hi_active = hi.is_some();
    let hi = hi.unwrap_or(&[]);

    loop {
        let lo_digit = lo.get(i).map(|&c| digit_value(c)).unwrap_or(0);
        let hi_digit = if hi_active { hi.get(i).map(|&c| digit_value(c)) } else { None };

        match hi_digit {
            None => {
                if lo_digit + 1 < BASE {
                    result.push(digit_char(lo_digit + 1));
                    return result;
                }
                // lo_digit is the top of the alphabet; carry and go deeper.
                result.push(digit_char(lo_digit));
                hi_active = false;
                i += 1;
            }
            Some(h) if h > lo_digit + 1 => {
                result.push(digit_char(lo_digit + (h - lo_digit) / 2));
                return result;
            }
            Some(h) if h == lo_digit + 1 => {
                // Matching lo here keeps us strictly below hi regardless of
                // what follows, so the upper bound no longer constrains us.
                result.push(digit_char(lo_digit));
                hi_active = false;
                i += 1;
            }
            Some(_) => {
                // h == lo_digit: copy the shared prefix and keep narrowing.
                result.push(digit_char(lo_digit));
                i += 1;
            }
        }
    }
}

/// A sortable key for ordering items in a fractional-index list.
///
/// Compares by plain string order: the `digits` prefix establishes position
/// among all replicas' keys, and the `~clientId` suffix only ever breaks an
/// exact tie between two independently generated keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FractionalIndex(String);

impl FractionalIndex {
    /// A key strictly between `lo` and `hi` (either bound may be absent,
    /// meaning "start of list" / "end of list").
    pub fn between(lo: Option<&FractionalIndex>, hi: Option<&FractionalIndex>, client_id: &ClientId) -> Self {
        let lo_digits = lo.map(|k| k.digits().as_bytes().to_vec()).unwrap_or_default();
        let hi_digits = hi.map(|k| k.digits().as_bytes().to_vec());
        let digits = digits_between(&lo_digits, hi_digits.as_deref());
        let digits = String::from_utf8(digits).expect("ALPHABET is ASCII");
        Self(format!("{digits}{KEY_SEPARATOR}{client_id}"))
    }

    fn digits(&self) -> &str {
        self.0.split(KEY_SEPARATOR).next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FractionalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MovePayload {
    item_key: String,
    position: FractionalIndex,
    value: Option<Value>,
}

/// An ordered collection of items, each positioned by a [`FractionalIndex`].
/// Moving an item (including inserting it for the first time) only ever
/// rewrites that item's own key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FractionalList {
    positions: BTreeMap<String, FractionalIndex>,
    values: BTreeMap<String, Value>,
}

impl FractionalList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in list order.
    pub fn ordered_items(&self) -> Vec<(&str, &Value)> {
        let mut items: Vec<_> = self
            .positions
            .iter()
            .map(|(key, pos)| (key.as_str(), pos))
            .collect();
        items.sort_by(|a, b| a.1.cmp(b.1));
        items
            .into_iter()
            .map(|(key, _)| (key, self.values.get(key).unwrap_or(&Value::Null)))
            .collect()
    }

    pub fn position_of(&self, item_key: &str) -> Option<&FractionalIndex> {
        self.positions.get(item_key)
    }

    /// Produce a `listMove` delta placing `item_key` (with `value`, if this
    /// is a first insertion) between `lo` and `hi`.
    pub fn local_move(
        &self,
        item_key: impl Into<String>,
        value: Option<Value>,
        lo: Option<&FractionalIndex>,
        hi: Option<&FractionalIndex>,
        ts: LogicalTimestamp,
    ) -> Delta {
        let position = FractionalIndex::between(lo, hi, &ts.client_id);
        let vector = VectorClock::from_pairs([(ts.client_id.clone(), ts.counter)]);
        let payload = serde_json::to_value(MovePayload {
            item_key: item_key.into(),
            position,
            value,
        })
        .expect("MovePayload always serializes");
        Delta::new(DeltaKind::ListMove, payload, ts, vector)
    }

    pub fn apply(&mut self, delta: &Delta) -> ChangeSet {
        if delta.kind != DeltaKind::ListMove {
            return vec![ChangeEvent::NoOp];
        }
        let Ok(payload) = delta.decode::<MovePayload>() else {
            return vec![ChangeEvent::NoOp];
        };

        // Last-writer-wins on position is unnecessary: every move generates
        // a fresh key strictly ordered relative to its neighbors at write
        // time, so simply overwriting converges (duplicate applies of the
        // same delta just set the same key again).
        if let Some(value) = payload.value {
            self.values.insert(payload.item_key.clone(), value);
        }
        self.positions.insert(payload.item_key.clone(), payload.position);

        vec![ChangeEvent::ItemMoved { key: payload.item_key }]
    }

    pub fn snapshot(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("FractionalList always serializes")
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
    fn between_none_and_none_is_a_valid_key() {
        let k = FractionalIndex::between(None, None, &cid("a"));
        assert!(!k.as_str().is_empty());
    }

    #[test]
    fn between_respects_bounds() {
        let low = FractionalIndex::between(None, None, &cid("a"));
        let high = FractionalIndex::between(Some(&low), None, &cid("a"));
        assert!(low < high);

        let middle = FractionalIndex::between(Some(&low), Some(&high), &cid("b"));
        assert!(low < middle);
        assert!(middle < high);
    }

    #[test]
    fn repeated_insertion_between_same_pair_never_collides_across_clients() {
        let low = FractionalIndex::between(None, None, &cid("a"));
        let high = FractionalIndex::between(Some(&low), None, &cid("a"));

        let from_a = FractionalIndex::between(Some(&low), Some(&high), &cid("client-a"));
        let from_b = FractionalIndex::between(Some(&low), Some(&high), &cid("client-b"));
        assert_ne!(from_a, from_b);
        assert!(low < from_a && from_a < high);
        assert!(low < from_b && from_b < high);
    }

    #[test]
    fn move_reorders_without_touching_other_items() {
        let mut list = FractionalList::new();
        let at_start = list.local_move("x", Some(Value::from("x")), None, None, LogicalTimestamp::new(1, cid("a")));
        list.apply(&at_start);
        let pos_x_before = list.position_of("x").cloned();

        let after_x = list.local_move(
            "y",
            Some(Value::from("y")),
            list.position_of("x"),
            None,
            LogicalTimestamp::new(1, cid("b")),
        );
        list.apply(&after_x);

        assert_eq!(list.position_of("x").cloned(), pos_x_before);
        let ordered: Vec<&str> = list.ordered_items().into_iter().map(|(k, _)| k).collect();
        assert_eq!(ordered, vec!["x", "y"]);
    }
}
