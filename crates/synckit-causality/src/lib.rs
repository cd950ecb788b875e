//! # synckit-causality
//!
//! The causality layer: vector clocks for detecting happens-before and
//! concurrency between operations, and delta selection — computing the
//! minimal set of deltas one peer is missing relative to another.
//!
//! ## Components
//!
//! - [`VectorClock`] / [`Comparison`] — causal ordering primitive.
//! - [`ClockEngine`] — issues monotonically increasing [`synckit_core::LogicalTimestamp`]s
//!   for the local replica.
//! - [`DeltaLog`] / [`InMemoryDeltaLog`] — append-only per-client delta
//!   sequences a document keeps so `delta_against` has something to scan.
//! - [`delta_against`] — the §4.3 algorithm: missing counter ranges in each
//!   direction, and the deltas that fill them.

pub mod clock;
pub mod engine;
pub mod log;
pub mod selection;

pub use clock::{Comparison, VectorClock};
pub use engine::ClockEngine;
pub use log::{DeltaLog, InMemoryDeltaLog, LoggedDelta};
pub use selection::{delta_against, DeltaSelection, SelectionOutcome};
