//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a round.
    ///
    /// Round IDs are:
    /// - Globally unique across both replicas
    /// - Immutable once assigned
    /// - Never reused
    RoundId
}

uuid_id! {
    /// Unique identifier for a stroke.
    ///
    /// Stroke IDs are assigned at creation and never reused, across the
    /// lifetime of a round and across both replicas. Receivers merge
    /// strokes by ID, so re-delivering the same stroke any number of
    /// times has the effect of delivering it once.
    StrokeId
}

uuid_id! {
    /// Unique identifier for a hole.
    HoleId
}

uuid_id! {
    /// Unique identifier for a target marker.
    TargetId
}

uuid_id! {
    /// Unique identifier for a club.
    ClubId
}

uuid_id! {
    /// Unique identifier for a club type.
    ClubTypeId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unique() {
        let id1 = StrokeId::new();
        let id2 = StrokeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn uuid_roundtrip() {
        let uuid = Uuid::new_v4();
        let id = RoundId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn display_is_uuid() {
        let uuid = Uuid::new_v4();
        let id = HoleId::from_uuid(uuid);
        assert_eq!(format!("{id}"), format!("{uuid}"));
    }
}
