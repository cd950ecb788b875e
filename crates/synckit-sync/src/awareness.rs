//! Ephemeral presence (`spec.md` §4.6). Never persisted; entries expire if
//! not refreshed within `inactivityTimeout`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::Value as Json;

use synckit_core::ClientId;

/// One replica's presence: opaque `state` (cursor, selection, etc.) plus a
/// per-client logical clock for LWW ordering of concurrent updates.
#[derive(Debug, Clone)]
pub struct AwarenessEntry {
    pub client_id: ClientId,
    pub state: Json,
    pub clock: u64,
    expires_at: Instant,
}

impl AwarenessEntry {
    pub fn state(&self) -> &Json {
        &self.state
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Per-document `clientId → AwarenessEntry` map.
pub struct AwarenessMap {
    entries: BTreeMap<ClientId, AwarenessEntry>,
    inactivity_timeout: Duration,
}

impl AwarenessMap {
    pub fn new(inactivity_timeout: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            inactivity_timeout,
        }
    }

    /// Update `client_id`'s presence. Last-writer-wins on `clock`: an
    /// update with a `clock` not greater than the stored one is dropped —
    /// a stale retransmit or reordered duplicate must not regress state.
    pub fn update(&mut self, client_id: ClientId, state: Json, clock: u64, now: Instant) -> bool {
        let accepted = match self.entries.get(&client_id) {
            Some(existing) if existing.clock >= clock => false,
            _ => true,
        };
        if accepted {
            self.entries.insert(
                client_id.clone(),
                AwarenessEntry {
                    client_id,
                    state,
                    clock,
                    expires_at: now + self.inactivity_timeout,
                },
            );
        }
        accepted
    }

    pub fn remove(&mut self, client_id: &ClientId) {
        self.entries.remove(client_id);
    }

    /// Drop every entry that has expired as of `now`, returning the ids
    /// removed so callers can notify peers of the departure.
    pub fn expire(&mut self, now: Instant) -> Vec<ClientId> {
        let expired: Vec<ClientId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.entries.remove(id);
        }
        expired
    }

    pub fn active(&self) -> impl Iterator<Item = &AwarenessEntry> {
        self.entries.values()
    }

    pub fn get(&self, client_id: &ClientId) -> Option<&AwarenessEntry> {
        self.entries.get(client_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
