//! # synckit-sync
//!
//! The per-document sync coordinator state machine and ephemeral
//! awareness/presence tracking (`spec.md` §4.4, §4.6). This crate owns
//! *when* a CRDT mutation gets applied, persisted, and broadcast — not
//! *what* the mutation does, which lives entirely in `synckit-crdt`.

pub mod awareness;
pub mod coordinator;
pub mod document;
pub mod observer;

pub use awareness::{AwarenessEntry, AwarenessMap};
pub use coordinator::{CoordinatorState, SyncCoordinator};
pub use document::DocumentCrdt;
pub use observer::Observer;
