//! Dynamic value model carried inside documents.
//!
//! Rather than ad-hoc typed unions at every CRDT boundary, every mutable
//! field value is a `Value`: a small tagged variant. LWW comparisons treat
//! values opaquely — only the logical timestamp is ever compared, never the
//! value itself — so `Value` only needs `PartialEq` for convergence tests,
//! not an ordering.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dynamic, JSON-shaped value.
///
/// `Object` uses a `BTreeMap` (not a `HashMap`) so two documents that
/// converge to the same fields always serialize identically — useful for
/// snapshot round-trip tests and for hashing.
///
/// Tagged (not untagged) on purpose: `Bytes(Vec<u8>)` and `Array(Vec<Value>)`
/// would be indistinguishable on the wire under an untagged encoding once
/// bytes happen to look like small integers.
///
/// `F64` wraps `OrderedFloat` rather than a bare `f64`: `OrSet` elements and
/// `FractionalList` keys need `Value` to be `Eq + Hash + Ord`, which `f64`
/// itself can never be (NaN has no total order). `OrderedFloat` gives a
/// total order (all NaN bit patterns sort equal, greater than everything
/// else) at the cost of not matching IEEE 754 comparison semantics for NaN —
/// acceptable here since values are only ever compared for set/map identity,
/// never arithmetically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(OrderedFloat<f64>),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(n) => Some(n.into_inner()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::I64(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::F64(OrderedFloat(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut obj = BTreeMap::new();
        obj.insert("a".to_string(), Value::I64(1));
        obj.insert("b".to_string(), Value::Array(vec![Value::Bool(true), Value::Null]));
        let v = Value::Object(obj);

        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
