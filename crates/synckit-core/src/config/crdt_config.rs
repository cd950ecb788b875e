use serde::{Deserialize, Serialize};

/// Which CRDT kinds a replica enables, for build-size pruning on
/// constrained targets (e.g. a browser-compiled client artifact that only
/// ever needs `Text`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CrdtKind {
    LwwDocument,
    Text,
    RichText,
    OrSet,
    PnCounter,
    FractionalIndex,
}

/// The set of CRDT kinds a replica has enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrdtConfig {
    pub enabled: Vec<CrdtKind>,
}

impl Default for CrdtConfig {
    fn default() -> Self {
        use CrdtKind::*;
        Self {
            enabled: vec![LwwDocument, Text, RichText, OrSet, PnCounter, FractionalIndex],
        }
    }
}

impl CrdtConfig {
    pub fn is_enabled(&self, kind: CrdtKind) -> bool {
        self.enabled.contains(&kind)
    }
}
