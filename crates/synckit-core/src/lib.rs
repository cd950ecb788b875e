//! # synckit-core
//!
//! Shared foundations for the SyncKit synchronization engine: the dynamic
//! `Value` model carried inside documents, replica/timestamp identifiers,
//! the error taxonomy surfaced to callers, configuration structs for every
//! tunable, and the `Persistence` trait consumed by the sync coordinator.
//!
//! This crate has no opinion about CRDTs, transport, or scheduling — those
//! live in `synckit-crdt`, `synckit-transport`, and `synckit-sync`
//! respectively. Everything here is shared vocabulary.

pub mod config;
pub mod error;
pub mod ids;
pub mod persistence;
pub mod value;

pub use error::{SyncKitError, SyncKitResult};
pub use ids::{ClientId, LogicalTimestamp};
pub use persistence::{DocumentRecord, Persistence};
pub use value::Value;
