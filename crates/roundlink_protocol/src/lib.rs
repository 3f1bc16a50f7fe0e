//! # roundlink Protocol
//!
//! Wire messages and CBOR codec for roundlink replication.
//!
//! This crate defines the messages exchanged between the two replicas:
//! - [`SyncMessage::RoundSnapshot`] — a full serialized round, applied
//!   by wholesale replacement (last-snapshot-wins)
//! - [`SyncMessage::StrokeBatch`] — one or more strokes, merged by
//!   identifier (idempotent, never replaces the round)
//! - [`SyncMessage::ClubsPush`] / [`SyncMessage::ClubTypesPush`] —
//!   one-way, replace-on-receipt reference data
//!
//! ## Key Invariants
//!
//! - Every message is self-describing: it carries enough of the round
//!   or strokes to be applied without any other message having arrived
//! - No ordering is assumed between messages; snapshot application is
//!   safe out of causal order and stroke re-delivery is a no-op
//! - The same serde schema is used on the wire and at rest

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod messages;

pub use codec::{decode_message, encode_message, from_cbor, to_cbor};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{StrokeBatch, SyncMessage};
