//! Delta computation (`spec.md` §4.3): given two peers' clocks, produce the
//! minimal set of deltas the remote side hasn't observed.
//!
//! Algorithm:
//! 1. Compute `missing_there = local.missing_ranges(remote)` — the ranges
//!    the remote peer lacks.
//! 2. Scan the delta log for every delta whose timestamp falls in one of
//!    those ranges.
//! 3. Return them in producer order per client; the receiver applies them
//!    in any order consistent with each CRDT's integration rule.
//!
//! Edge policies: a truncated log below what's needed yields
//! [`SelectionOutcome::SnapshotReset`] instead of a partial delta list; an
//! empty intersection yields an empty, non-reset result (idempotent).

use tracing::{debug, warn};

use synckit_core::ClientId;

use crate::clock::VectorClock;
use crate::log::{DeltaLog, LoggedDelta};

/// The deltas selected for a peer, or a signal that a snapshot is required
/// instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The peer can be brought up to date with these deltas alone.
    Deltas(Vec<LoggedDelta>),
    /// The log has been truncated below what the peer needs; send a full
    /// snapshot and let the peer discard any concurrent state (or merge it
    /// via CRDT load semantics, if supported) before resuming delta sync.
    SnapshotReset,
}

/// The result of computing what a `remote` peer is missing relative to
/// `local`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaSelection {
    pub outcome: SelectionOutcome,
}

/// Compute the deltas `remote_clock` is missing relative to `local_clock`,
/// scanning `log` for the actual payloads.
pub fn delta_against(
    local_clock: &VectorClock,
    remote_clock: &VectorClock,
    log: &impl DeltaLog,
) -> DeltaSelection {
    let missing_there = local_clock.missing_ranges(remote_clock);

    if missing_there.is_empty() {
        debug!("delta selection: peer already up to date");
        return DeltaSelection {
            outcome: SelectionOutcome::Deltas(Vec::new()),
        };
    }

    for (client_id, &(low, _high)) in &missing_there {
        if let Some(floor) = log.retained_floor(client_id) {
            if floor > low {
                warn!(
                    client = %client_id,
                    floor,
                    needed_from = low,
                    "delta log truncated below what peer needs; falling back to snapshot"
                );
                return DeltaSelection {
                    outcome: SelectionOutcome::SnapshotReset,
                };
            }
        }
    }

    let mut deltas = Vec::new();
    for (client_id, &(low, high)) in &missing_there {
        deltas.extend(log.range(client_id, low, high));
    }
    // Producer order per clientId is already guaranteed by `DeltaLog::range`;
    // stable-sort by client id only to give a deterministic cross-client
    // ordering for callers that serialize the whole batch at once.
    deltas.sort_by(|a, b| a.ts.client_id.as_str().cmp(b.ts.client_id.as_str()));

    DeltaSelection {
        outcome: SelectionOutcome::Deltas(deltas),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::InMemoryDeltaLog;
    use synckit_core::LogicalTimestamp;

    fn cid(s: &str) -> ClientId {
        ClientId::from(s)
    }

    fn push(log: &mut InMemoryDeltaLog, client: &str, counter: u64) {
        log.append(LoggedDelta {
            ts: LogicalTimestamp::new(counter, cid(client)),
            payload: vec![counter as u8],
        });
    }

    #[test]
    fn empty_intersection_is_idempotent() {
        let local = VectorClock::new();
        let remote = VectorClock::new();
        let log = InMemoryDeltaLog::new();
        let result = delta_against(&local, &remote, &log);
        assert_eq!(
            result.outcome,
            SelectionOutcome::Deltas(Vec::new())
        );
    }

    // spec.md §8 S2, driven through the log this time.
    #[test]
    fn scenario_s2_selects_exact_missing_ranges() {
        let mut log = InMemoryDeltaLog::new();
        for c in 1..=5 {
            push(&mut log, "a", c);
        }
        for c in 1..=3 {
            push(&mut log, "b", c);
        }

        let mut local = VectorClock::new();
        local.set(cid("a"), 5);
        local.set(cid("b"), 3);

        let mut remote = VectorClock::new();
        remote.set(cid("a"), 3);
        remote.set(cid("b"), 3);

        let result = delta_against(&local, &remote, &log);
        let SelectionOutcome::Deltas(deltas) = result.outcome else {
            panic!("expected Deltas outcome");
        };
        let counters: Vec<u64> = deltas.iter().map(|d| d.ts.counter).collect();
        assert_eq!(counters, vec![4, 5]);
    }

    #[test]
    fn truncated_log_triggers_snapshot_reset() {
        struct TruncatedLog;
        impl DeltaLog for TruncatedLog {
            fn append(&mut self, _delta: LoggedDelta) {}
            fn retained_floor(&self, _client_id: &ClientId) -> Option<u64> {
                Some(10) // everything below counter 10 has been GC'd
            }
            fn range(&self, _client_id: &ClientId, _low: u64, _high: u64) -> Vec<LoggedDelta> {
                Vec::new()
            }
        }

        let mut local = VectorClock::new();
        local.set(cid("a"), 5);
        let remote = VectorClock::new();

        let result = delta_against(&local, &remote, &TruncatedLog);
        assert_eq!(result.outcome, SelectionOutcome::SnapshotReset);
    }
}
