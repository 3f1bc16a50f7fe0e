//! # roundlink Store
//!
//! The replica-local round store for roundlink.
//!
//! This crate provides:
//! - [`RoundStore`] — sole authority for the replica's active round:
//!   the mutation API, the round phase state machine, and the inbound
//!   apply primitives used by the sync layer
//! - [`Persistence`] — durable storage abstraction, with
//!   [`FilePersistence`] (atomic write-then-rename, advisory
//!   single-writer lock) and [`MemoryPersistence`] (tests)
//! - [`EventFeed`] / [`RoundEvent`] — observer interface for
//!   collaborators (UI, telemetry) with no reactivity-framework
//!   dependency
//! - [`ChangeSink`] — the seam through which successful local mutations
//!   are reported to the sync layer
//!
//! ## Key Invariants
//!
//! - The store's internal lock serializes all writers; transport
//!   callbacks may arrive on any thread
//! - Mutations persist synchronously before the sink is signaled
//! - The sink and event feed are called after the internal lock is
//!   released, so the sync layer never re-enters the store on the
//!   outbound path
//! - Inbound applies ([`RoundStore::apply_snapshot`],
//!   [`RoundStore::merge_strokes`]) emit events but never signal the
//!   sink, so a received change is never re-broadcast

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod events;
mod file;
mod persist;
mod store;

pub use error::{StoreError, StoreResult};
pub use events::{ChangeSink, EventFeed, RoundChange, RoundEvent};
pub use file::FilePersistence;
pub use persist::{MemoryPersistence, Persistence, PersistenceError, PersistenceResult};
pub use store::{MergeOutcome, RoundPhase, RoundStore};
