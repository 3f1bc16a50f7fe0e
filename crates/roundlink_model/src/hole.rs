//! Holes and target markers.

use crate::geo::GeoPoint;
use crate::id::{HoleId, TargetId};
use serde::{Deserialize, Serialize};

/// A hole within a round.
///
/// Hole numbers are 1-based and sequential within a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    /// Stable identifier.
    pub id: HoleId,
    /// 1-based hole number.
    pub number: u32,
    /// Location of the green / pin area.
    pub location: GeoPoint,
    /// Tee marker location, if known.
    pub tee: Option<GeoPoint>,
    /// Listed yardage, if known.
    pub yards: Option<u32>,
    /// Par, if known.
    pub par: Option<u32>,
}

impl Hole {
    /// Creates a hole with a fresh identifier.
    #[must_use]
    pub fn new(number: u32, location: GeoPoint, par: Option<u32>) -> Self {
        Self {
            id: HoleId::new(),
            number,
            location,
            tee: None,
            yards: None,
            par,
        }
    }
}

/// A user-placed aiming marker on a hole.
///
/// Targets are ephemeral and replicated like any other round field; the
/// set of targets for a hole is always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Stable identifier.
    pub id: TargetId,
    /// 1-based hole number the marker is placed on.
    pub hole_number: u32,
    /// Marker location.
    pub location: GeoPoint,
}

impl Target {
    /// Creates a target with a fresh identifier.
    #[must_use]
    pub fn new(hole_number: u32, location: GeoPoint) -> Self {
        Self {
            id: TargetId::new(),
            hole_number,
            location,
        }
    }
}
