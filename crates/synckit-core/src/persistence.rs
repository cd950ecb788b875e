//! The persistence interface consumed by the sync coordinator.
//!
//! SyncKit does not ship a storage backend: clients are expected to back
//! this with a KV store, servers with relational + pub/sub. Implementations
//! must be atomic per call; concurrency control across calls is the
//! caller's responsibility (the coordinator serializes access to a single
//! document's record itself, per `spec.md` §5).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncKitResult;
use crate::ids::ClientId;

/// One persisted record per document: an opaque snapshot, the vector clock
/// it was taken at (encoded as client → counter pairs to avoid a dependency
/// on `synckit-causality` from this crate), and a last-write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Opaque bytes produced by a CRDT's `snapshot()`.
    pub snapshot: Vec<u8>,
    /// `(client_id, counter)` pairs summarizing the clock at snapshot time.
    pub clock: Vec<(ClientId, u64)>,
    /// Milliseconds since the Unix epoch.
    pub updated_at_millis: i64,
}

/// The persistence interface consumed by the sync coordinator (`spec.md` §6).
///
/// `append_delta` is optional: a backend that can't support an append-only
/// delta log (or chooses not to) returns `Ok(false)` from
/// `supports_delta_log`, and the coordinator falls back to snapshot-only
/// persistence on every mutation.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Prepare the backend for use (open connections, run migrations, ...).
    async fn init(&self) -> SyncKitResult<()>;

    /// Fetch the most recent persisted record for a document, if any.
    async fn get(&self, doc_id: &str) -> SyncKitResult<Option<DocumentRecord>>;

    /// Atomically overwrite the persisted record for a document.
    async fn put(&self, doc_id: &str, record: DocumentRecord) -> SyncKitResult<()>;

    /// Whether this backend supports `append_delta`. Checked once by the
    /// coordinator at `open()` time.
    fn supports_delta_log(&self) -> bool {
        false
    }

    /// Append a single serialized delta to the document's durable log.
    /// Only called when `supports_delta_log()` returns `true`.
    async fn append_delta(&self, _doc_id: &str, _delta: &[u8]) -> SyncKitResult<()> {
        Ok(())
    }

    /// List every document id known to this backend.
    async fn list_docs(&self) -> SyncKitResult<Vec<String>>;

    /// Remove a document's persisted record entirely.
    async fn delete(&self, doc_id: &str) -> SyncKitResult<()>;
}

#[cfg(test)]
pub mod test_support {
    //! An in-memory `Persistence` double for exercising the sync
    //! coordinator without a real backend. Not exported outside test
    //! builds — production consumers bring their own backend.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryPersistence {
        docs: Mutex<HashMap<String, DocumentRecord>>,
        deltas: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    }

    impl InMemoryPersistence {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn delta_log(&self, doc_id: &str) -> Vec<Vec<u8>> {
            self.deltas
                .lock()
                .unwrap()
                .get(doc_id)
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl Persistence for InMemoryPersistence {
        async fn init(&self) -> SyncKitResult<()> {
            Ok(())
        }

        async fn get(&self, doc_id: &str) -> SyncKitResult<Option<DocumentRecord>> {
            Ok(self.docs.lock().unwrap().get(doc_id).cloned())
        }

        async fn put(&self, doc_id: &str, record: DocumentRecord) -> SyncKitResult<()> {
            self.docs.lock().unwrap().insert(doc_id.to_string(), record);
            Ok(())
        }

        fn supports_delta_log(&self) -> bool {
            true
        }

        async fn append_delta(&self, doc_id: &str, delta: &[u8]) -> SyncKitResult<()> {
            self.deltas
                .lock()
                .unwrap()
                .entry(doc_id.to_string())
                .or_default()
                .push(delta.to_vec());
            Ok(())
        }

        async fn list_docs(&self) -> SyncKitResult<Vec<String>> {
            Ok(self.docs.lock().unwrap().keys().cloned().collect())
        }

        async fn delete(&self, doc_id: &str) -> SyncKitResult<()> {
            self.docs.lock().unwrap().remove(doc_id);
            self.deltas.lock().unwrap().remove(doc_id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemoryPersistence;
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryPersistence::new();
        store.init().await.unwrap();
        let record = DocumentRecord {
            snapshot: vec![1, 2, 3],
            clock: vec![(ClientId::from("a"), 3)],
            updated_at_millis: 42,
        };
        store.put("doc-1", record).await.unwrap();

        let got = store.get("doc-1").await.unwrap().unwrap();
        assert_eq!(got.snapshot, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn missing_document_is_none() {
        let store = InMemoryPersistence::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
