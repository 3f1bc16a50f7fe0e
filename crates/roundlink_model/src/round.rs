//! The round — the unit of replication.

use crate::geo::GeoPoint;
use crate::hole::{Hole, Target};
use crate::id::{RoundId, StrokeId};
use crate::stroke::Stroke;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A round of golf: the unit of replication between the two replicas.
///
/// Each replica owns exactly one copy of the active round; all
/// coordination happens through message exchange. Strokes are kept in
/// insertion order; their per-hole ordering is carried by
/// [`Stroke::stroke_number`].
///
/// # Invariants
///
/// - `current_hole_index` is a valid index into `holes` whenever `holes`
///   is non-empty
/// - `completed_holes` only contains hole numbers present in `holes`
/// - for every hole, stroke numbers form exactly `1..=n`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Stable, globally unique identifier.
    pub id: RoundId,
    /// Identifier of the course being played.
    pub course_id: String,
    /// Display name of the course.
    pub course_name: String,
    /// When the round was started.
    pub started_at: Timestamp,
    /// All strokes, in insertion order.
    pub strokes: Vec<Stroke>,
    /// Holes, in play order.
    pub holes: Vec<Hole>,
    /// Numbers of holes the golfer has marked complete.
    pub completed_holes: BTreeSet<u32>,
    /// Index into `holes` of the hole currently being played.
    pub current_hole_index: u32,
    /// User-placed aiming markers, across all holes.
    pub targets: Vec<Target>,
}

impl Round {
    /// Creates a new round with a fresh identifier.
    #[must_use]
    pub fn new(course_id: impl Into<String>, course_name: impl Into<String>, holes: Vec<Hole>) -> Self {
        Self {
            id: RoundId::new(),
            course_id: course_id.into(),
            course_name: course_name.into(),
            started_at: Timestamp::now(),
            strokes: Vec::new(),
            holes,
            completed_holes: BTreeSet::new(),
            current_hole_index: 0,
            targets: Vec::new(),
        }
    }

    /// Returns the hole with the given number, if present.
    #[must_use]
    pub fn hole(&self, number: u32) -> Option<&Hole> {
        self.holes.iter().find(|h| h.number == number)
    }

    /// Returns true if a hole with the given number exists.
    #[must_use]
    pub fn has_hole(&self, number: u32) -> bool {
        self.hole(number).is_some()
    }

    /// Returns the next sequential hole number.
    #[must_use]
    pub fn next_hole_number(&self) -> u32 {
        self.holes.len() as u32 + 1
    }

    /// Returns the stroke with the given identifier, if present.
    #[must_use]
    pub fn stroke(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|s| s.id == id)
    }

    /// Returns true if a stroke with the given identifier exists.
    #[must_use]
    pub fn contains_stroke(&self, id: StrokeId) -> bool {
        self.stroke(id).is_some()
    }

    /// Returns the strokes for a hole, ordered by stroke number.
    #[must_use]
    pub fn strokes_for_hole(&self, hole_number: u32) -> Vec<&Stroke> {
        let mut strokes: Vec<&Stroke> = self
            .strokes
            .iter()
            .filter(|s| s.hole_number == hole_number)
            .collect();
        strokes.sort_by_key(|s| s.stroke_number);
        strokes
    }

    /// Returns the number of strokes recorded for a hole.
    #[must_use]
    pub fn stroke_count_for_hole(&self, hole_number: u32) -> u32 {
        self.strokes
            .iter()
            .filter(|s| s.hole_number == hole_number)
            .count() as u32
    }

    /// Returns the stroke number the next stroke on a hole should carry.
    #[must_use]
    pub fn next_stroke_number(&self, hole_number: u32) -> u32 {
        self.stroke_count_for_hole(hole_number) + 1
    }

    /// Appends a stroke.
    pub fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Removes a stroke by identifier and closes the numbering gap on
    /// its hole.
    ///
    /// Returns `false` if no such stroke exists.
    pub fn remove_stroke(&mut self, id: StrokeId) -> bool {
        let Some(pos) = self.strokes.iter().position(|s| s.id == id) else {
            return false;
        };
        let hole_number = self.strokes[pos].hole_number;
        self.strokes.remove(pos);
        self.resequence_hole(hole_number);
        true
    }

    /// Moves a stroke to `new_number` within its hole.
    ///
    /// All other strokes on the hole shift while keeping their relative
    /// order, and stroke numbers are reassigned `1..=n`. Returns `false`
    /// if no such stroke exists. The caller must have validated that
    /// `new_number` is within `1..=n`.
    pub fn move_stroke(&mut self, id: StrokeId, new_number: u32) -> bool {
        let Some(stroke) = self.stroke(id) else {
            return false;
        };
        let hole_number = stroke.hole_number;

        // Per-hole order with the moved stroke extracted and reinserted.
        let mut order: Vec<StrokeId> = self
            .strokes_for_hole(hole_number)
            .iter()
            .map(|s| s.id)
            .collect();
        order.retain(|sid| *sid != id);
        let index = (new_number as usize - 1).min(order.len());
        order.insert(index, id);

        self.apply_hole_order(hole_number, &order);
        true
    }

    /// Replaces all targets for a hole with the given set.
    pub fn replace_targets(&mut self, hole_number: u32, locations: &[GeoPoint]) {
        self.targets.retain(|t| t.hole_number != hole_number);
        self.targets
            .extend(locations.iter().map(|loc| Target::new(hole_number, *loc)));
    }

    /// Returns the targets placed on a hole.
    #[must_use]
    pub fn targets_for_hole(&self, hole_number: u32) -> Vec<&Target> {
        self.targets
            .iter()
            .filter(|t| t.hole_number == hole_number)
            .collect()
    }

    /// Reassigns stroke numbers `1..=n` on a hole, preserving the
    /// current per-hole order.
    fn resequence_hole(&mut self, hole_number: u32) {
        let order: Vec<StrokeId> = self
            .strokes_for_hole(hole_number)
            .iter()
            .map(|s| s.id)
            .collect();
        self.apply_hole_order(hole_number, &order);
    }

    /// Writes stroke numbers back so the hole's strokes follow `order`.
    fn apply_hole_order(&mut self, hole_number: u32, order: &[StrokeId]) {
        for stroke in &mut self.strokes {
            if stroke.hole_number != hole_number {
                continue;
            }
            if let Some(pos) = order.iter().position(|id| *id == stroke.id) {
                stroke.stroke_number = pos as u32 + 1;
            }
        }
    }
}
