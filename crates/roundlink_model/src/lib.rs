//! # roundlink Model
//!
//! Domain types for the roundlink golf round replication engine.
//!
//! This crate defines the unit of replication — the [`Round`] — and every
//! value it contains: [`Stroke`], [`Hole`], [`Target`], club reference
//! data, identifier newtypes, and geographic coordinates.
//!
//! ## Design
//!
//! - Pure data: no I/O, no locking, no transport knowledge
//! - All types are serde-derived; the same schema is used on the wire
//!   and at rest
//! - Identifiers are UUID newtypes, assigned at creation and never
//!   reused, which is what makes message re-delivery idempotent

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod club;
mod geo;
mod hole;
mod id;
mod round;
mod stroke;
mod time;

pub use club::{Club, ClubType};
pub use geo::GeoPoint;
pub use hole::{Hole, Target};
pub use id::{ClubId, ClubTypeId, HoleId, RoundId, StrokeId, TargetId};
pub use round::Round;
pub use stroke::{ShotDirection, Stroke, StrokeAnnotations};
pub use time::Timestamp;
