//! The concrete CRDT a coordinator manages for one document (`spec.md` §3).
//!
//! A document is backed by exactly one CRDT kind, selected by
//! [`synckit_core::config::CrdtKind`] when the document is first created.
//! `DocumentCrdt` is the dispatch point: it routes `apply`/`snapshot`/`load`
//! to whichever concrete type backs this document, so the coordinator
//! itself stays CRDT-agnostic.

use serde::{Deserialize, Serialize};

use synckit_core::config::CrdtKind;
use synckit_crdt::{ChangeSet, Delta, FractionalList, LwwDocument, OrSet, PnCounter, RichText, TextCrdt};

/// One document's CRDT state. `RichText` is paired with its own `TextCrdt`
/// since formatting spans are anchored to that text's character ids
/// (`spec.md` §4.2.3) — the pair moves and snapshots together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DocumentCrdt {
    Lww(LwwDocument),
    Text(TextCrdt),
    RichText { text: TextCrdt, formatting: RichText },
    Set(OrSet<synckit_core::Value>),
    Counter(PnCounter),
    List(FractionalList),
}

impl DocumentCrdt {
    pub fn new(kind: CrdtKind) -> Self {
        match kind {
            CrdtKind::LwwDocument => DocumentCrdt::Lww(LwwDocument::new()),
            CrdtKind::Text => DocumentCrdt::Text(TextCrdt::new()),
            CrdtKind::RichText => DocumentCrdt::RichText {
                text: TextCrdt::new(),
                formatting: RichText::new(),
            },
            CrdtKind::OrSet => DocumentCrdt::Set(OrSet::new()),
            CrdtKind::PnCounter => DocumentCrdt::Counter(PnCounter::new()),
            CrdtKind::FractionalIndex => DocumentCrdt::List(FractionalList::new()),
        }
    }

    pub fn kind(&self) -> CrdtKind {
        match self {
            DocumentCrdt::Lww(_) => CrdtKind::LwwDocument,
            DocumentCrdt::Text(_) => CrdtKind::Text,
            DocumentCrdt::RichText { .. } => CrdtKind::RichText,
            DocumentCrdt::Set(_) => CrdtKind::OrSet,
            DocumentCrdt::Counter(_) => CrdtKind::PnCounter,
            DocumentCrdt::List(_) => CrdtKind::FractionalIndex,
        }
    }

    /// Apply a delta (local or remote) to whichever CRDT backs this
    /// document. A `RichText` document routes `formatApply` to its span
    /// set and everything else (`textInsert`/`textDelete`) to its text.
    pub fn apply(&mut self, delta: &Delta) -> ChangeSet {
        match self {
            DocumentCrdt::Lww(doc) => doc.apply(delta),
            DocumentCrdt::Text(doc) => doc.apply(delta),
            DocumentCrdt::RichText { text, formatting } => {
                if delta.kind == synckit_crdt::DeltaKind::FormatApply {
                    formatting.apply(delta)
                } else {
                    text.apply(delta)
                }
            }
            DocumentCrdt::Set(doc) => doc.apply(delta),
            DocumentCrdt::Counter(doc) => doc.apply(delta),
            DocumentCrdt::List(doc) => doc.apply(delta),
        }
    }

    pub fn as_lww_mut(&mut self) -> Option<&mut LwwDocument> {
        match self {
            DocumentCrdt::Lww(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextCrdt> {
        match self {
            DocumentCrdt::Text(doc) => Some(doc),
            DocumentCrdt::RichText { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn as_richtext_mut(&mut self) -> Option<(&mut TextCrdt, &mut RichText)> {
        match self {
            DocumentCrdt::RichText { text, formatting } => Some((text, formatting)),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut OrSet<synckit_core::Value>> {
        match self {
            DocumentCrdt::Set(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_counter_mut(&mut self) -> Option<&mut PnCounter> {
        match self {
            DocumentCrdt::Counter(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut FractionalList> {
        match self {
            DocumentCrdt::List(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("DocumentCrdt always serializes")
    }

    pub fn load(kind: CrdtKind, bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let loaded: Self = serde_json::from_slice(bytes)?;
        debug_assert_eq!(loaded.kind(), kind, "snapshot kind must match the document's configured kind");
        Ok(loaded)
    }
}
