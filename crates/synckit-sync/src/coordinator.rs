//! Per-document sync coordinator state machine (`spec.md` §4.4).
//!
//! `Idle → Loading → Ready → Syncing ⇄ Ready → Closed`. Every state
//! mutation — local or remote — passes through `Ready → Syncing → Ready`
//! so an observer callback firing mid-transition never sees a
//! half-applied document (`spec.md` §5's "observers fire after apply has
//! committed" ordering guarantee).
//!
//! The coordinator does not itself know how to produce a `Delta` from a
//! CRDT-specific operation (`setField` vs. `insert` vs. `format` all take
//! different arguments) — a caller mutates the document via
//! [`SyncCoordinator::document_mut`] to get a `Delta`, then hands it to
//! [`SyncCoordinator::submit_local_delta`] to drive it through persistence,
//! logging, and observer notification. This mirrors
//! `cortex-multiagent/src/sync/protocol.rs`'s `DeltaSyncEngine`, adapted
//! from its synchronous rusqlite calls to the async `Persistence` trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use synckit_causality::{delta_against, ClockEngine, DeltaLog, InMemoryDeltaLog, LoggedDelta, SelectionOutcome, VectorClock};
use synckit_core::config::CrdtKind;
use synckit_core::persistence::{DocumentRecord, Persistence};
use synckit_core::{ClientId, SyncKitError, SyncKitResult};
use synckit_crdt::{ChangeSet, Delta};

use crate::document::DocumentCrdt;
use crate::observer::Observer;

/// A coordinator's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Loading,
    Ready,
    Syncing,
    Closed,
}

/// Threshold from `spec.md` §7: repeated persistence failure past this
/// many attempts surfaces `PersistenceLost` to observers.
const PERSIST_FAILURE_THRESHOLD: u32 = 5;

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub struct SyncCoordinator {
    doc_id: String,
    kind: CrdtKind,
    state: CoordinatorState,
    doc: Option<DocumentCrdt>,
    engine: ClockEngine,
    log: InMemoryDeltaLog,
    persistence: Arc<dyn Persistence>,
    outbound: Vec<LoggedDelta>,
    subscribers: BTreeMap<ClientId, VectorClock>,
    observers: Vec<Arc<dyn Observer>>,
    dirty: bool,
    persist_failures: u32,
}

impl SyncCoordinator {
    pub fn new(doc_id: impl Into<String>, kind: CrdtKind, client_id: ClientId, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            doc_id: doc_id.into(),
            kind,
            state: CoordinatorState::Idle,
            doc: None,
            engine: ClockEngine::new(client_id),
            log: InMemoryDeltaLog::new(),
            persistence,
            outbound: Vec::new(),
            subscribers: BTreeMap::new(),
            observers: Vec::new(),
            dirty: false,
            persist_failures: 0,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    /// `Idle → Loading → Ready`: pull the last snapshot from persistence,
    /// or start fresh if this document has never been persisted.
    #[instrument(skip(self), fields(doc_id = %self.doc_id))]
    pub async fn open(&mut self) -> SyncKitResult<()> {
        self.state = CoordinatorState::Loading;
        match self.persistence.get(&self.doc_id).await? {
            Some(record) => {
                self.doc = Some(
                    DocumentCrdt::load(self.kind, &record.snapshot)
                        .map_err(|e| SyncKitError::PersistenceFailed(e.to_string()))?,
                );
                self.engine = ClockEngine::from_clock(self.engine.client_id().clone(), VectorClock::from_pairs(record.clock));
            }
            None => {
                self.doc = Some(DocumentCrdt::new(self.kind));
            }
        }
        self.state = CoordinatorState::Ready;
        debug!("document opened");
        Ok(())
    }

    /// Mutable access to the backing CRDT, for producing a `Delta` via its
    /// own `local_*` method before calling [`Self::submit_local_delta`].
    pub fn document_mut(&mut self) -> SyncKitResult<&mut DocumentCrdt> {
        self.doc.as_mut().ok_or(SyncKitError::Closed("document not open"))
    }

    pub fn document(&self) -> SyncKitResult<&DocumentCrdt> {
        self.doc.as_ref().ok_or(SyncKitError::Closed("document not open"))
    }

    pub fn clock(&self) -> VectorClock {
        self.engine.snapshot()
    }

    /// Tick the local clock, for callers that need a `LogicalTimestamp`
    /// before constructing a CRDT-specific operation.
    pub fn tick(&self) -> synckit_core::LogicalTimestamp {
        self.engine.tick()
    }

    /// Drive a locally-produced delta through `Ready → Syncing → Ready`:
    /// apply it, log it, persist, queue for subscribers, notify observers.
    #[instrument(skip(self, delta), fields(doc_id = %self.doc_id))]
    pub async fn submit_local_delta(&mut self, delta: Delta) -> SyncKitResult<ChangeSet> {
        self.require_ready()?;
        self.state = CoordinatorState::Syncing;

        let changes = {
            let doc = self.doc.as_mut().ok_or(SyncKitError::Closed("document not open"))?;
            doc.apply(&delta)
        };
        self.engine.observe(&delta.vector);
        self.record_and_persist(&delta).await;

        self.notify(&changes);
        self.state = CoordinatorState::Ready;
        Ok(changes)
    }

    /// Validate and apply a remote delta. Rejects causally-corrupt deltas
    /// with `CausalViolation` without poisoning the document state
    /// (`spec.md` §4.4's failure semantics) — the coordinator stays
    /// `Ready` and the caller may continue processing other deltas.
    #[instrument(skip(self, delta), fields(doc_id = %self.doc_id))]
    pub async fn apply_remote_delta(&mut self, delta: Delta) -> SyncKitResult<ChangeSet> {
        self.require_ready()?;
        self.validate_causality(&delta)?;

        self.state = CoordinatorState::Syncing;
        let changes = {
            let doc = self.doc.as_mut().ok_or(SyncKitError::Closed("document not open"))?;
            doc.apply(&delta)
        };
        self.engine.observe(&delta.vector);
        self.record_and_persist(&delta).await;

        self.notify(&changes);
        self.state = CoordinatorState::Ready;
        Ok(changes)
    }

    /// `spec.md` §4.3: a delta's vector must be `≤ localClock ⊔
    /// {producer → producer.counter}`; anything else indicates corruption.
    fn validate_causality(&self, delta: &Delta) -> SyncKitResult<()> {
        let mut expected = self.engine.snapshot();
        expected.set(delta.ts.client_id.clone(), delta.ts.counter);
        if delta.vector.le(&expected) {
            Ok(())
        } else {
            warn!(doc_id = %self.doc_id, "rejecting delta with inconsistent causal vector");
            Err(SyncKitError::CausalViolation {
                local_vector: format!("{:?}", self.engine.snapshot()),
                delta_vector: format!("{:?}", delta.vector),
            })
        }
    }

    async fn record_and_persist(&mut self, delta: &Delta) {
        self.log.append(LoggedDelta {
            ts: delta.ts.clone(),
            payload: serde_json::to_vec(delta).unwrap_or_default(),
        });
        self.outbound.push(LoggedDelta {
            ts: delta.ts.clone(),
            payload: serde_json::to_vec(delta).unwrap_or_default(),
        });

        let Some(doc) = &self.doc else { return };
        let record = DocumentRecord {
            snapshot: doc.snapshot(),
            clock: self.engine.snapshot().to_pairs(),
            updated_at_millis: now_millis(),
        };
        match self.persistence.put(&self.doc_id, record).await {
            Ok(()) => {
                self.dirty = false;
                self.persist_failures = 0;
            }
            Err(err) => {
                self.dirty = true;
                self.persist_failures += 1;
                warn!(doc_id = %self.doc_id, attempts = self.persist_failures, %err, "persistence write failed");
                if self.persist_failures >= PERSIST_FAILURE_THRESHOLD {
                    for observer in &self.observers {
                        observer.on_persistence_lost(&self.doc_id, self.persist_failures);
                    }
                }
            }
        }
    }

    /// Outstanding deltas not yet handed to the transport layer.
    pub fn drain_outbound(&mut self) -> Vec<LoggedDelta> {
        std::mem::take(&mut self.outbound)
    }

    /// Compute what `peer_clock` is missing and register it in the fanout
    /// set, so a later local change is queued for this peer too.
    pub fn subscribe(&mut self, peer: ClientId, peer_clock: VectorClock) -> SelectionOutcome {
        let outcome = delta_against(&self.engine.snapshot(), &peer_clock, &self.log);
        self.subscribers.insert(peer, peer_clock);
        outcome.outcome
    }

    /// Remove a peer from the fanout set. If no peers and no observers
    /// remain, evict the document (`Closed`) — it stays persisted, but
    /// this coordinator releases its in-memory state (`spec.md` §3
    /// Lifecycles).
    pub fn unsubscribe(&mut self, peer: &ClientId) {
        self.subscribers.remove(peer);
        if self.subscribers.is_empty() && self.observers.is_empty() {
            self.state = CoordinatorState::Closed;
        }
    }

    pub fn register_observer(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Cooperative shutdown: flush whatever's dirty, then close. Any
    /// in-flight local mutation must finish before callers invoke this.
    #[instrument(skip(self), fields(doc_id = %self.doc_id))]
    pub async fn close(&mut self) -> SyncKitResult<()> {
        if self.dirty {
            if let Some(doc) = &self.doc {
                let record = DocumentRecord {
                    snapshot: doc.snapshot(),
                    clock: self.engine.snapshot().to_pairs(),
                    updated_at_millis: now_millis(),
                };
                self.persistence.put(&self.doc_id, record).await?;
                self.dirty = false;
            }
        }
        self.state = CoordinatorState::Closed;
        Ok(())
    }

    fn require_ready(&self) -> SyncKitResult<()> {
        match self.state {
            CoordinatorState::Ready => Ok(()),
            CoordinatorState::Closed => Err(SyncKitError::Closed("coordinator is closed")),
            _ => Err(SyncKitError::ProtocolError(format!(
                "coordinator not ready (state = {:?})",
                self.state
            ))),
        }
    }

    fn notify(&self, changes: &ChangeSet) {
        for observer in &self.observers {
            observer.on_changes(&self.doc_id, changes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::observer::test_support::RecordingObserver;

    #[derive(Default)]
    struct FakePersistence {
        docs: StdMutex<HashMap<String, DocumentRecord>>,
        fail_puts: StdMutex<u32>,
    }

    #[async_trait]
    impl Persistence for FakePersistence {
        async fn init(&self) -> SyncKitResult<()> {
            Ok(())
        }

        async fn get(&self, doc_id: &str) -> SyncKitResult<Option<DocumentRecord>> {
            Ok(self.docs.lock().unwrap().get(doc_id).cloned())
        }

        async fn put(&self, doc_id: &str, record: DocumentRecord) -> SyncKitResult<()> {
            let mut remaining = self.fail_puts.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SyncKitError::PersistenceFailed("simulated".into()));
            }
            self.docs.lock().unwrap().insert(doc_id.to_string(), record);
            Ok(())
        }

        async fn list_docs(&self) -> SyncKitResult<Vec<String>> {
            Ok(self.docs.lock().unwrap().keys().cloned().collect())
        }

        async fn delete(&self, doc_id: &str) -> SyncKitResult<()> {
            self.docs.lock().unwrap().remove(doc_id);
            Ok(())
        }
    }

    fn cid(s: &str) -> ClientId {
        ClientId::from(s)
    }

    async fn opened(client: &str) -> SyncCoordinator {
        let mut coordinator = SyncCoordinator::new("doc-1", CrdtKind::LwwDocument, cid(client), Arc::new(FakePersistence::default()));
        coordinator.open().await.unwrap();
        coordinator
    }

    #[tokio::test]
    async fn open_starts_fresh_when_nothing_persisted() {
        let coordinator = opened("a").await;
        assert_eq!(coordinator.state(), CoordinatorState::Ready);
        assert_eq!(coordinator.document().unwrap().kind(), CrdtKind::LwwDocument);
    }

    #[tokio::test]
    async fn local_change_round_trips_through_ready_syncing_ready() {
        let mut coordinator = opened("a").await;
        let ts = coordinator.tick();
        let delta = coordinator
            .document_mut()
            .unwrap()
            .as_lww_mut()
            .unwrap()
            .local_set("title", synckit_core::Value::from("hello"), ts);

        let changes = coordinator.submit_local_delta(delta).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(coordinator.state(), CoordinatorState::Ready);
        assert_eq!(coordinator.drain_outbound().len(), 1);
    }

    #[tokio::test]
    async fn remote_delta_with_bad_vector_is_rejected_without_poisoning_state() {
        let mut coordinator = opened("a").await;
        let bogus_ts = synckit_core::LogicalTimestamp::new(99, cid("b"));
        let mut bogus_vector = VectorClock::new();
        bogus_vector.set(cid("b"), 99);
        bogus_vector.set(cid("ghost"), 5); // a client the local replica never heard of, and no local knowledge of "b" either

        let delta = synckit_crdt::Delta::new(
            synckit_crdt::DeltaKind::SetField,
            json!({"name": "title", "value": "x", "deleted": false}),
            bogus_ts,
            bogus_vector,
        );

        let result = coordinator.apply_remote_delta(delta).await;
        assert!(matches!(result, Err(SyncKitError::CausalViolation { .. })));
        assert_eq!(coordinator.state(), CoordinatorState::Ready);
    }

    #[tokio::test]
    async fn persistence_failure_marks_dirty_but_still_applies_in_memory() {
        let persistence = Arc::new(FakePersistence::default());
        *persistence.fail_puts.lock().unwrap() = 1;
        let mut coordinator = SyncCoordinator::new("doc-1", CrdtKind::LwwDocument, cid("a"), persistence);
        coordinator.open().await.unwrap();

        let ts = coordinator.tick();
        let delta = coordinator
            .document_mut()
            .unwrap()
            .as_lww_mut()
            .unwrap()
            .local_set("title", synckit_core::Value::from("hello"), ts);
        let changes = coordinator.submit_local_delta(delta).await.unwrap();

        assert_eq!(changes.len(), 1);
        assert!(coordinator.dirty);
    }

    #[tokio::test]
    async fn unsubscribe_closes_coordinator_once_no_peers_or_observers_remain() {
        let mut coordinator = opened("a").await;
        let peer = cid("b");
        coordinator.subscribe(peer.clone(), VectorClock::new());
        assert_eq!(coordinator.subscriber_count(), 1);

        coordinator.unsubscribe(&peer);
        assert_eq!(coordinator.state(), CoordinatorState::Closed);
    }

    #[tokio::test]
    async fn registered_observer_receives_persistence_lost_after_threshold() {
        let persistence = Arc::new(FakePersistence::default());
        *persistence.fail_puts.lock().unwrap() = PERSIST_FAILURE_THRESHOLD;
        let mut coordinator = SyncCoordinator::new("doc-1", CrdtKind::LwwDocument, cid("a"), persistence);
        coordinator.open().await.unwrap();
        let observer = Arc::new(RecordingObserver::default());
        coordinator.register_observer(observer.clone());

        for _ in 0..PERSIST_FAILURE_THRESHOLD {
            let ts = coordinator.tick();
            let delta = coordinator
                .document_mut()
                .unwrap()
                .as_lww_mut()
                .unwrap()
                .local_set("title", synckit_core::Value::from("x"), ts);
            coordinator.submit_local_delta(delta).await.unwrap();
        }

        assert_eq!(observer.persistence_lost.lock().unwrap().len(), 1);
    }
}
