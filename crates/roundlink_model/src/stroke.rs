//! Strokes and their annotations.

use crate::geo::GeoPoint;
use crate::id::{ClubId, StrokeId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Observed direction of a shot relative to the aim line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotDirection {
    /// On the aim line.
    Straight,
    /// Left of the aim line.
    Left,
    /// Right of the aim line.
    Right,
}

/// Optional annotations attached to a stroke at creation or afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeAnnotations {
    /// Observed shot direction.
    pub direction: Option<ShotDirection>,
    /// Where the ball came to rest, if recorded.
    pub landing: Option<GeoPoint>,
    /// Whether this stroke is a penalty stroke.
    pub is_penalty: bool,
    /// Compass heading of the intended trajectory, degrees.
    pub trajectory_heading: Option<f64>,
}

/// A single stroke within a round.
///
/// The `id` is globally unique and stable for the stroke's lifetime;
/// `stroke_number` is the 1-based position within the stroke's hole and
/// may change when strokes are deleted or renumbered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Stable, globally unique identifier.
    pub id: StrokeId,
    /// 1-based hole number this stroke belongs to.
    pub hole_number: u32,
    /// 1-based sequence number within the hole.
    pub stroke_number: u32,
    /// Where the stroke was taken.
    pub location: GeoPoint,
    /// The club used.
    pub club_id: ClubId,
    /// When the stroke was recorded.
    pub timestamp: Timestamp,
    /// Observed shot direction.
    pub direction: Option<ShotDirection>,
    /// Where the ball came to rest, if recorded.
    pub landing: Option<GeoPoint>,
    /// Whether this is a penalty stroke.
    pub is_penalty: bool,
    /// Compass heading of the intended trajectory, degrees.
    pub trajectory_heading: Option<f64>,
}

impl Stroke {
    /// Creates a stroke with a fresh identifier and the current time.
    #[must_use]
    pub fn new(
        hole_number: u32,
        stroke_number: u32,
        location: GeoPoint,
        club_id: ClubId,
        annotations: StrokeAnnotations,
    ) -> Self {
        Self {
            id: StrokeId::new(),
            hole_number,
            stroke_number,
            location,
            club_id,
            timestamp: Timestamp::now(),
            direction: annotations.direction,
            landing: annotations.landing,
            is_penalty: annotations.is_penalty,
            trajectory_heading: annotations.trajectory_heading,
        }
    }
}
