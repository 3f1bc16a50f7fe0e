//! # roundlink Engine
//!
//! Round-state replication between two intermittently connected
//! replicas: a primary handheld device and a secondary wrist-worn
//! companion.
//!
//! This crate provides:
//! - [`SyncCoordinator`] — decides what to transmit after a local
//!   mutation and how to apply an inbound message
//! - [`PendingOperationQueue`] — durable buffer of locally committed,
//!   unacknowledged strokes, retried without duplicating effect
//! - [`Transport`] — abstraction over an unreliable, possibly
//!   unreachable channel, with [`MockTransport`] (scripted) and
//!   [`LinkTransport`] (in-memory pair) implementations
//! - [`Replica`] — explicit dependency-injection wiring of one store,
//!   one queue, one coordinator, and one transport per process
//!
//! ## Replication model
//!
//! - Structural changes (holes, completion state, current-hole pointer,
//!   targets) broadcast the **entire round** as a snapshot; the receiver
//!   replaces its copy wholesale (last-snapshot-wins). A concurrent edit
//!   on the other replica can be silently lost; this is a deliberate
//!   simplicity/availability trade-off, kept behind the coordinator so
//!   a field-level merge could replace it without touching the store or
//!   the transport contract.
//! - Strokes additionally travel through the pending queue as
//!   independently resendable units, merged by identifier at the
//!   receiver, so the highest-value mutations survive dropped snapshots
//!   and arrive without clobbering structural state.
//!
//! ## Key Invariants
//!
//! - At-least-once delivery: a stroke stays queued until acknowledged
//! - Idempotency: re-delivery of a known stroke id is a no-op
//! - No cross-message ordering is assumed; snapshots are safe to apply
//!   out of causal order (they always win)

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod link;
mod location;
mod queue;
mod replica;
mod transport;

pub use config::{DeviceRole, RetryConfig, SyncConfig};
pub use coordinator::{SyncCoordinator, SyncStats};
pub use error::{SyncError, SyncResult};
pub use link::LinkTransport;
pub use location::{FixedLocationProvider, LocationProvider};
pub use queue::PendingOperationQueue;
pub use replica::Replica;
pub use transport::{
    MessageHandler, MockTransport, ReachabilityHandler, SendCompletion, Transport,
};
