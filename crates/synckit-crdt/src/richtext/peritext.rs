//! Rich-text formatting spans, Peritext-style (`spec.md` §4.2.3).
//!
//! A span formats the run of characters between two anchors. Anchors are
//! character ids (not indices) with a before/after side, so a span's
//! boundary survives concurrent inserts exactly at that boundary: anchoring
//! "after char X, side After" keeps including anything inserted right after
//! X, while "before char Y, side Before" excludes anything inserted right
//! before Y. Document-boundary formatting uses the same
//! [`crate::text::Origin::DocStart`]/`DocEnd` sentinels the text CRDT uses
//! (`spec.md` §9).
//!
//! Resolution is read-time and piecewise: for each visible character
//! position and each attribute key, the span with the latest `ts` that
//! covers that position wins. A span with `value: None` is an "unformat"
//! tombstone — it can still win at a position (removing formatting) if it's
//! the latest span covering it.

use serde::{Deserialize, Serialize};

use synckit_causality::VectorClock;
use synckit_core::{LogicalTimestamp, Value};

use crate::delta::{ChangeEvent, ChangeSet, Delta, DeltaKind};
use crate::text::Origin;

/// Which side of the anchored character the span boundary sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorSide {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub origin: Origin,
    pub side: AnchorSide,
}

impl Anchor {
    pub fn before(origin: Origin) -> Self {
        Self { origin, side: AnchorSide::Before }
    }

    pub fn after(origin: Origin) -> Self {
        Self { origin, side: AnchorSide::After }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FormatSpan {
    start: Anchor,
    end: Anchor,
    attribute: String,
    value: Option<Value>,
    ts: LogicalTimestamp,
}

#[derive(Debug, Serialize, Deserialize)]
struct FormatPayload {
    start: Anchor,
    end: Anchor,
    attribute: String,
    value: Option<Value>,
}

/// A set of formatting spans layered over a [`crate::text::TextCrdt`]'s
/// character sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RichText {
    spans: Vec<FormatSpan>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a `formatApply` delta. `value: None` removes `attribute`
    /// from the covered range (an unformat tombstone).
    pub fn local_format(
        &self,
        start: Anchor,
        end: Anchor,
        attribute: impl Into<String>,
        value: Option<Value>,
        ts: LogicalTimestamp,
    ) -> Delta {
        let vector = VectorClock::from_pairs([(ts.client_id.clone(), ts.counter)]);
        let payload = serde_json::to_value(FormatPayload {
            start,
            end,
            attribute: attribute.into(),
            value,
        })
        .expect("FormatPayload always serializes");
        Delta::new(DeltaKind::FormatApply, payload, ts, vector)
    }

    pub fn apply(&mut self, delta: &Delta) -> ChangeSet {
        if delta.kind != DeltaKind::FormatApply {
            return vec![ChangeEvent::NoOp];
        }
        let Ok(payload) = delta.decode::<FormatPayload>() else {
            return vec![ChangeEvent::NoOp];
        };
        if self.spans.iter().any(|s| s.ts == delta.ts) {
            return vec![ChangeEvent::NoOp]; // already observed
        }
        let value_json = payload
            .value
            .clone()
            .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null))
            .unwrap_or(serde_json::Value::Null);
        self.spans.push(FormatSpan {
            start: payload.start.clone(),
            end: payload.end.clone(),
            attribute: payload.attribute.clone(),
            value: payload.value,
            ts: delta.ts.clone(),
        });
        vec![ChangeEvent::FormatApplied {
            start: 0,
            end: 0,
            attribute: payload.attribute,
            value: value_json,
        }]
    }

    /// True if `position` (an index into `visible_ids`) falls within
    /// `span`'s anchored range.
    fn covers(span: &FormatSpan, visible_ids: &[LogicalTimestamp], position: usize) -> bool {
        let start_idx = anchor_index(&span.start, visible_ids, true);
        let end_idx = anchor_index(&span.end, visible_ids, false);
        position >= start_idx && position < end_idx
    }

    /// Resolve the winning value for `attribute` at every visible position,
    /// given the text CRDT's current visible character id sequence.
    pub fn resolve(&self, attribute: &str, visible_ids: &[LogicalTimestamp]) -> Vec<Option<Value>> {
        let mut result = vec![None; visible_ids.len()];
        for position in 0..visible_ids.len() {
            let mut winner: Option<&FormatSpan> = None;
            for span in &self.spans {
                if span.attribute != attribute {
                    continue;
                }
                if !Self::covers(span, visible_ids, position) {
                    continue;
                }
                let is_newer = match winner {
                    Some(w) => span.ts > w.ts,
                    None => true,
                };
                if is_newer {
                    winner = Some(span);
                }
            }
            result[position] = winner.and_then(|s| s.value.clone());
        }
        result
    }

    pub fn snapshot(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("RichText always serializes")
    }

    pub fn load(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Map an anchor to a position in `visible_ids`. `is_start` picks the
/// inclusive/exclusive convention: a `Before`/`After` anchor resolves to
/// the index immediately surrounding the named character, clamped to the
/// document boundaries for the `DocStart`/`DocEnd` sentinels.
fn anchor_index(anchor: &Anchor, visible_ids: &[LogicalTimestamp], is_start: bool) -> usize {
    match &anchor.origin {
        Origin::DocStart => 0,
        Origin::DocEnd => visible_ids.len(),
        Origin::Char(id) => {
            let Some(pos) = visible_ids.iter().position(|v| v == id) else {
                // The anchored character was deleted; fall back to the
                // boundary that keeps the span from silently growing.
                return if is_start { visible_ids.len() } else { 0 };
            };
            match anchor.side {
                AnchorSide::Before => pos,
                AnchorSide::After => pos + 1,
            }
        }
    }
}
