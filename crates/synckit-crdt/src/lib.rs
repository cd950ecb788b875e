//! Convergent replicated data types for SyncKit.
//!
//! Each module under this crate is a self-contained CRDT: it owns its state,
//! produces [`delta::Delta`]s describing local changes, and applies deltas
//! (local or remote) idempotently and commutatively. There is no shared
//! `Crdt` trait — each data type's `apply`/`snapshot`/`load` surface differs
//! enough (a text CRDT's apply takes an `Id`-addressed insertion point, a
//! counter's takes a signed magnitude) that forcing a common interface would
//! buy generic code at the cost of a worse fit everywhere, so each module is
//! used concretely by its owner in `synckit-sync`.

pub mod counter;
pub mod delta;
pub mod list;
pub mod lww;
pub mod richtext;
pub mod set;
pub mod text;

pub use counter::PnCounter;
pub use delta::{ChangeEvent, ChangeSet, Delta, DeltaKind};
pub use list::{FractionalIndex, FractionalList};
pub use lww::{LwwDocument, LwwEntry};
pub use richtext::{Anchor, AnchorSide, RichText};
pub use set::{OrSet, UniqueTag};
pub use text::{Origin, TextCrdt};
