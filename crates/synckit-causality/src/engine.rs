//! Issues monotonically increasing [`LogicalTimestamp`]s for the local
//! replica and tracks its own vector clock.
//!
//! `tick` is guarded by a `Mutex` rather than an atomic: the local counter
//! and the vector clock entry for this client must move together, and the
//! spec's single-threaded-cooperative-scheduler assumption (§5) doesn't
//! prevent a library embedder from sharing a `ClockEngine` handle across
//! OS threads.

use std::sync::Mutex;

use synckit_core::{ClientId, LogicalTimestamp};

use crate::clock::VectorClock;

/// Per-replica clock engine: the single source of truth for "what time is
/// it locally" and "what has this replica observed so far."
pub struct ClockEngine {
    client_id: ClientId,
    clock: Mutex<VectorClock>,
}

impl ClockEngine {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            clock: Mutex::new(VectorClock::new()),
        }
    }

    /// Construct from a previously-persisted clock (rejoin after restart).
    pub fn from_clock(client_id: ClientId, clock: VectorClock) -> Self {
        Self {
            client_id,
            clock: Mutex::new(clock),
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Atomically advance the local counter and return the resulting
    /// timestamp. Strictly monotone under concurrent callers on this
    /// replica.
    pub fn tick(&self) -> LogicalTimestamp {
        let mut clock = self.clock.lock().expect("clock mutex poisoned");
        let counter = clock.increment(&self.client_id);
        LogicalTimestamp::new(counter, self.client_id.clone())
    }

    /// Merge a remote clock into the local one (e.g. after applying a
    /// batch of remote deltas).
    pub fn observe(&self, remote: &VectorClock) {
        let mut clock = self.clock.lock().expect("clock mutex poisoned");
        clock.merge(remote);
    }

    /// Record that a specific remote operation was applied, advancing this
    /// replica's knowledge of that client's counter without advancing the
    /// local client's own counter.
    pub fn observe_entry(&self, client_id: &ClientId, counter: u64) {
        let mut clock = self.clock.lock().expect("clock mutex poisoned");
        clock.set(client_id.clone(), counter);
    }

    /// A snapshot of the current clock, suitable for persisting or sending
    /// to a peer.
    pub fn snapshot(&self) -> VectorClock {
        self.clock.lock().expect("clock mutex poisoned").clone()
    }
}
