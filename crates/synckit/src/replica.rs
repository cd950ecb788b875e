//! The `Replica` root context (`spec.md` §9 Design Notes: "express the
//! clock counter, persistence handle, and connection pool as explicit
//! dependencies held by a root replica context object rather than ambient
//! singletons").
//!
//! One `Replica` per process/tab; it owns the document registry (a
//! coordinator per open document) and the per-document awareness maps.
//! Transport is optional — a `Replica` with no `server_url` configured
//! runs entirely offline, persisting locally and never dialing out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use synckit_core::config::{CrdtKind, SyncKitConfig};
use synckit_core::persistence::Persistence;
use synckit_core::{ClientId, SyncKitError, SyncKitResult};
use synckit_sync::{AwarenessMap, SyncCoordinator};

use crate::doc_handle::DocHandle;

/// Root context for one replica. Construct once per process (or per
/// embedding tab) from a [`SyncKitConfig`] and a [`Persistence`]
/// implementation supplied by the host application.
pub struct Replica {
    client_id: ClientId,
    config: SyncKitConfig,
    persistence: Arc<dyn Persistence>,
    coordinators: Mutex<BTreeMap<String, SyncCoordinator>>,
    awareness: Mutex<BTreeMap<String, AwarenessMap>>,
}

impl Replica {
    /// Construct a replica. Uses `config.client_id` if present, otherwise
    /// generates a fresh one (`spec.md` §3: ClientID is "assigned once per
    /// replica at bootstrap").
    pub fn new(config: SyncKitConfig, persistence: Arc<dyn Persistence>) -> Arc<Self> {
        let client_id = config
            .client_id
            .clone()
            .map(ClientId::from)
            .unwrap_or_else(ClientId::generate);

        Arc::new(Self {
            client_id,
            config,
            persistence,
            coordinators: Mutex::new(BTreeMap::new()),
            awareness: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn config(&self) -> &SyncKitConfig {
        &self.config
    }

    /// Open (or re-open) a document by id, creating its coordinator and
    /// awareness map if this is the first open this process (`spec.md`
    /// §3 Lifecycles: "created on first write ... kept in memory while
    /// any subscriber holds them").
    pub async fn open_document(self: &Arc<Self>, doc_id: impl Into<String>, kind: CrdtKind) -> SyncKitResult<DocHandle> {
        let doc_id = doc_id.into();

        {
            let mut coordinators = self.coordinators.lock().await;
            if !coordinators.contains_key(&doc_id) {
                let mut coordinator = SyncCoordinator::new(doc_id.clone(), kind, self.client_id.clone(), self.persistence.clone());
                coordinator.open().await?;
                coordinators.insert(doc_id.clone(), coordinator);
            }
        }
        {
            let mut awareness = self.awareness.lock().await;
            awareness
                .entry(doc_id.clone())
                .or_insert_with(|| AwarenessMap::new(Duration::from_secs(self.config.awareness.inactivity_timeout_secs)));
        }

        Ok(DocHandle::new(self.clone(), doc_id))
    }

    /// Release a document's in-memory state once no subscribers or
    /// observers hold it. A no-op if the document was never opened.
    pub async fn close_document(&self, doc_id: &str) -> SyncKitResult<()> {
        let mut coordinators = self.coordinators.lock().await;
        if let Some(mut coordinator) = coordinators.remove(doc_id) {
            coordinator.close().await?;
        }
        self.awareness.lock().await.remove(doc_id);
        Ok(())
    }

    pub(crate) async fn with_coordinator<R>(
        &self,
        doc_id: &str,
        f: impl FnOnce(&mut SyncCoordinator) -> R,
    ) -> SyncKitResult<R> {
        let mut coordinators = self.coordinators.lock().await;
        let coordinator = coordinators
            .get_mut(doc_id)
            .ok_or(SyncKitError::Closed("document not open"))?;
        Ok(f(coordinator))
    }

    pub(crate) async fn with_coordinator_async<R, Fut>(
        &self,
        doc_id: &str,
        f: impl FnOnce(&mut SyncCoordinator) -> Fut,
    ) -> SyncKitResult<R>
    where
        Fut: std::future::Future<Output = SyncKitResult<R>>,
    {
        let mut coordinators = self.coordinators.lock().await;
        let coordinator = coordinators
            .get_mut(doc_id)
            .ok_or(SyncKitError::Closed("document not open"))?;
        f(coordinator).await
    }

    pub(crate) async fn with_awareness<R>(&self, doc_id: &str, f: impl FnOnce(&mut AwarenessMap) -> R) -> SyncKitResult<R> {
        let mut awareness = self.awareness.lock().await;
        let map = awareness
            .get_mut(doc_id)
            .ok_or(SyncKitError::Closed("document not open"))?;
        Ok(f(map))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FakePersistence;
    use super::*;

    #[tokio::test]
    async fn opening_the_same_document_twice_reuses_the_coordinator() {
        let replica = Replica::new(SyncKitConfig::default(), Arc::new(FakePersistence::default()));
        let a = replica.open_document("doc-1", CrdtKind::LwwDocument).await.unwrap();
        let b = replica.open_document("doc-1", CrdtKind::LwwDocument).await.unwrap();
        assert_eq!(a.doc_id(), b.doc_id());
    }

    #[tokio::test]
    async fn close_document_releases_in_memory_state() {
        let replica = Replica::new(SyncKitConfig::default(), Arc::new(FakePersistence::default()));
        replica.open_document("doc-1", CrdtKind::LwwDocument).await.unwrap();
        replica.close_document("doc-1").await.unwrap();

        let err = replica
            .with_coordinator("doc-1", |c| c.state())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncKitError::Closed(_)));
    }
}
