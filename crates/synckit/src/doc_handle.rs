//! Consumer-facing handle to one open document.
//!
//! A `DocHandle` is cheap to clone (it's just a `doc_id` plus a shared
//! `Arc<Replica>`); all real state lives in the replica's coordinator and
//! awareness registries, accessed through locked lookups so multiple
//! handles to the same document stay consistent.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as Json;

use synckit_causality::{SelectionOutcome, VectorClock};
use synckit_core::{ClientId, LogicalTimestamp, SyncKitResult};
use synckit_crdt::{ChangeSet, Delta};
use synckit_sync::document::DocumentCrdt;
use synckit_sync::{AwarenessEntry, Observer};

use crate::replica::Replica;

#[derive(Clone)]
pub struct DocHandle {
    replica: Arc<Replica>,
    doc_id: String,
}

impl DocHandle {
    pub(crate) fn new(replica: Arc<Replica>, doc_id: String) -> Self {
        Self { replica, doc_id }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub async fn clock(&self) -> SyncKitResult<VectorClock> {
        self.replica.with_coordinator(&self.doc_id, |c| c.clock()).await
    }

    /// Tick the local clock, for producing a `LogicalTimestamp` to pass
    /// into a CRDT-specific `local_*` call.
    pub async fn tick(&self) -> SyncKitResult<LogicalTimestamp> {
        self.replica.with_coordinator(&self.doc_id, |c| c.tick()).await
    }

    /// Mutate the backing CRDT and submit the resulting delta in one step:
    /// `mutate` gets `&mut DocumentCrdt` and must return the `Delta` it
    /// produced (e.g. via `doc.as_lww_mut().unwrap().local_set(...)`).
    pub async fn mutate(&self, mutate: impl FnOnce(&mut DocumentCrdt) -> Delta) -> SyncKitResult<ChangeSet> {
        let delta = self
            .replica
            .with_coordinator(&self.doc_id, |c| c.document_mut().map(mutate))
            .await??;
        self.submit_local_delta(delta).await
    }

    pub async fn submit_local_delta(&self, delta: Delta) -> SyncKitResult<ChangeSet> {
        self.replica
            .with_coordinator_async(&self.doc_id, |c| c.submit_local_delta(delta))
            .await
    }

    pub async fn apply_remote_delta(&self, delta: Delta) -> SyncKitResult<ChangeSet> {
        self.replica
            .with_coordinator_async(&self.doc_id, |c| c.apply_remote_delta(delta))
            .await
    }

    pub async fn subscribe(&self, peer: ClientId, peer_clock: VectorClock) -> SyncKitResult<SelectionOutcome> {
        self.replica.with_coordinator(&self.doc_id, |c| c.subscribe(peer, peer_clock)).await
    }

    pub async fn unsubscribe(&self, peer: &ClientId) -> SyncKitResult<()> {
        self.replica.with_coordinator(&self.doc_id, |c| c.unsubscribe(peer)).await
    }

    pub async fn register_observer(&self, observer: Arc<dyn Observer>) -> SyncKitResult<()> {
        self.replica
            .with_coordinator(&self.doc_id, |c| c.register_observer(observer))
            .await
    }

    /// Update this replica's own presence for the document (`spec.md`
    /// §4.6). Returns `false` if `clock` doesn't advance past the
    /// previously stored value for this client (a stale or duplicate
    /// update).
    pub async fn update_awareness(&self, client_id: ClientId, state: Json, clock: u64) -> SyncKitResult<bool> {
        let now = Instant::now();
        self.replica
            .with_awareness(&self.doc_id, |map| map.update(client_id, state, clock, now))
            .await
    }

    pub async fn remove_awareness(&self, client_id: &ClientId) -> SyncKitResult<()> {
        self.replica.with_awareness(&self.doc_id, |map| map.remove(client_id)).await
    }

    /// Every currently-active (non-expired) presence entry.
    pub async fn awareness_snapshot(&self) -> SyncKitResult<Vec<AwarenessEntry>> {
        self.replica
            .with_awareness(&self.doc_id, |map| map.active().cloned().collect())
            .await
    }

    /// Drop expired awareness entries, returning the ids removed so the
    /// caller can broadcast their departure.
    pub async fn expire_awareness(&self) -> SyncKitResult<Vec<ClientId>> {
        let now = Instant::now();
        self.replica.with_awareness(&self.doc_id, |map| map.expire(now)).await
    }
}
