//! Change observers (`spec.md` §4.4): the coordinator notifies these after
//! a commit, never mid-apply. Grounded on the callback-after-commit shape
//! of `cortex-multiagent/src/projection/subscription.rs`'s push-to-queue
//! step, adapted from a push-to-subscriber-queue model to a direct
//! synchronous callback since `spec.md` §5 requires observers to fire
//! strictly after commit and before the next dequeue, never yielding
//! themselves.

use synckit_crdt::ChangeSet;

/// A consumer of document change notifications and persistence-health
/// signals. Implementations must not block or yield (`spec.md` §5) — if an
/// observer needs to do async work, it should hand the event off to a
/// channel rather than await inline.
pub trait Observer: Send + Sync {
    /// Fired after a delta (local or remote) has been applied and
    /// persisted (or marked dirty on persistence failure).
    fn on_changes(&self, doc_id: &str, changes: &ChangeSet);

    /// Fired when persistence has failed `attempts` consecutive times past
    /// the retry threshold. The document remains correct in memory.
    fn on_persistence_lost(&self, doc_id: &str, attempts: u32);
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingObserver {
        pub changes: Mutex<Vec<(String, ChangeSet)>>,
        pub persistence_lost: Mutex<Vec<(String, u32)>>,
    }

    impl Observer for RecordingObserver {
        fn on_changes(&self, doc_id: &str, changes: &ChangeSet) {
            self.changes.lock().unwrap().push((doc_id.to_string(), changes.clone()));
        }

        fn on_persistence_lost(&self, doc_id: &str, attempts: u32) {
            self.persistence_lost.lock().unwrap().push((doc_id.to_string(), attempts));
        }
    }
}
