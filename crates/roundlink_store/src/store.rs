//! The round store: mutation API and inbound apply primitives.

use crate::error::{StoreError, StoreResult};
use crate::events::{ChangeSink, EventFeed, RoundChange, RoundEvent};
use crate::persist::Persistence;
use parking_lot::{Mutex, RwLock};
use roundlink_model::{
    Club, ClubId, ClubType, GeoPoint, Hole, Round, RoundId, Stroke, StrokeAnnotations, StrokeId,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, warn};

/// The lifecycle phase of a replica's round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No round is loaded.
    NoRound,
    /// A round is active and accepting mutations.
    Active,
    /// The round was ended; a new round or inbound snapshot starts over.
    Retired,
}

impl RoundPhase {
    /// Returns true if mutations are accepted.
    #[must_use]
    pub fn can_mutate(&self) -> bool {
        matches!(self, RoundPhase::Active)
    }
}

/// Result of merging an inbound stroke batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    /// Strokes appended (previously unknown ids).
    pub merged: u32,
    /// Strokes ignored (already-known ids).
    pub ignored: u32,
}

struct StoreInner {
    round: Option<Round>,
    phase: RoundPhase,
    clubs: Vec<Club>,
    club_types: Vec<ClubType>,
}

impl StoreInner {
    fn active_round_mut(&mut self) -> StoreResult<&mut Round> {
        if !self.phase.can_mutate() {
            return Err(StoreError::NoActiveRound);
        }
        self.round.as_mut().ok_or(StoreError::NoActiveRound)
    }
}

/// Sole authority for a replica's local round and its durable
/// persistence.
///
/// Every public mutation validates its preconditions, applies the change
/// in memory, persists synchronously, emits a [`RoundEvent`], and
/// signals the attached [`ChangeSink`]. The internal lock serializes all
/// writers; sink and event callbacks run with the lock released.
///
/// Inbound applies ([`apply_snapshot`](Self::apply_snapshot),
/// [`merge_strokes`](Self::merge_strokes)) emit events but never signal
/// the sink.
pub struct RoundStore {
    persistence: Arc<dyn Persistence>,
    inner: Mutex<StoreInner>,
    feed: EventFeed,
    sink: RwLock<Option<Arc<dyn ChangeSink>>>,
    persistence_failures: AtomicU64,
}

impl RoundStore {
    /// Opens a store, restoring any persisted round and reference data.
    pub fn open(persistence: Arc<dyn Persistence>) -> StoreResult<Self> {
        let round = persistence.load_round()?;
        let (clubs, club_types) = persistence.load_reference()?;
        let phase = if round.is_some() {
            RoundPhase::Active
        } else {
            RoundPhase::NoRound
        };

        Ok(Self {
            persistence,
            inner: Mutex::new(StoreInner {
                round,
                phase,
                clubs,
                club_types,
            }),
            feed: EventFeed::new(),
            sink: RwLock::new(None),
            persistence_failures: AtomicU64::new(0),
        })
    }

    /// Attaches the sync layer's change sink.
    ///
    /// At most one sink is attached; attaching again replaces it.
    pub fn attach_sink(&self, sink: Arc<dyn ChangeSink>) {
        *self.sink.write() = Some(sink);
    }

    /// Subscribes to store events.
    pub fn subscribe(&self) -> Receiver<RoundEvent> {
        self.feed.subscribe()
    }

    /// Returns the current round phase.
    pub fn phase(&self) -> RoundPhase {
        self.inner.lock().phase
    }

    /// Returns a copy of the active round, if any.
    pub fn current_round(&self) -> Option<Round> {
        self.inner.lock().round.clone()
    }

    /// Returns the active round's identifier, if any.
    pub fn round_id(&self) -> Option<RoundId> {
        self.inner.lock().round.as_ref().map(|r| r.id)
    }

    /// Returns the club list.
    pub fn clubs(&self) -> Vec<Club> {
        self.inner.lock().clubs.clone()
    }

    /// Returns the club type list.
    pub fn club_types(&self) -> Vec<ClubType> {
        self.inner.lock().club_types.clone()
    }

    /// Returns how many persistence cycles have failed.
    pub fn persistence_failures(&self) -> u64 {
        self.persistence_failures.load(Ordering::Relaxed)
    }

    // --- local mutations -------------------------------------------------

    /// Starts a new round and makes it active.
    ///
    /// Quick rounds pass an empty hole list and build holes as play
    /// progresses with [`add_hole`](Self::add_hole). Starting a round
    /// while one is active replaces it.
    pub fn start_round(
        &self,
        course_id: impl Into<String>,
        course_name: impl Into<String>,
        holes: Vec<Hole>,
    ) -> StoreResult<Round> {
        let round = {
            let mut inner = self.inner.lock();
            let round = Round::new(course_id, course_name, holes);
            inner.round = Some(round.clone());
            inner.phase = RoundPhase::Active;
            self.persist_round(&round);
            round
        };
        self.notify(&round, RoundChange::RoundStarted);
        Ok(round)
    }

    /// Records a stroke on a hole.
    ///
    /// The stroke number is the count of existing strokes for that hole
    /// plus one.
    pub fn add_stroke(
        &self,
        hole_number: u32,
        location: GeoPoint,
        club_id: ClubId,
        annotations: StrokeAnnotations,
    ) -> StoreResult<Stroke> {
        if hole_number == 0 {
            return Err(StoreError::out_of_range(
                "hole number",
                0,
                1,
                u32::MAX as usize,
            ));
        }

        let (stroke, round) = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            let stroke = Stroke::new(
                hole_number,
                round.next_stroke_number(hole_number),
                location,
                club_id,
                annotations,
            );
            round.push_stroke(stroke.clone());
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            (stroke, snapshot)
        };
        self.notify(&round, RoundChange::StrokeAdded(stroke.clone()));
        Ok(stroke)
    }

    /// Removes a stroke by identifier.
    ///
    /// An absent identifier is a no-op returning `false`, which makes
    /// duplicate delete requests harmless. Remaining strokes on the hole
    /// are renumbered to close the gap.
    pub fn delete_stroke(&self, id: StrokeId) -> StoreResult<bool> {
        let round = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            if !round.remove_stroke(id) {
                return Ok(false);
            }
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            snapshot
        };
        self.notify(&round, RoundChange::StrokeDeleted(id));
        Ok(true)
    }

    /// Moves a stroke to a new position within its hole.
    ///
    /// All other strokes on the hole shift while keeping their relative
    /// order.
    pub fn renumber_stroke(&self, id: StrokeId, new_number: u32) -> StoreResult<()> {
        let round = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            let stroke = round.stroke(id).ok_or(StoreError::StrokeNotFound { id })?;
            let count = round.stroke_count_for_hole(stroke.hole_number);
            if new_number < 1 || new_number > count {
                return Err(StoreError::out_of_range(
                    "stroke number",
                    new_number as usize,
                    1,
                    count as usize,
                ));
            }
            round.move_stroke(id, new_number);
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            snapshot
        };
        self.notify(
            &round,
            RoundChange::StrokeRenumbered {
                id,
                number: new_number,
            },
        );
        Ok(())
    }

    /// Marks a hole complete. Idempotent; returns whether anything
    /// changed.
    pub fn complete_hole(&self, hole_number: u32) -> StoreResult<bool> {
        let round = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            if !round.has_hole(hole_number) {
                return Err(StoreError::HoleNotFound {
                    number: hole_number,
                });
            }
            if !round.completed_holes.insert(hole_number) {
                return Ok(false);
            }
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            snapshot
        };
        self.notify(&round, RoundChange::HoleCompleted(hole_number));
        Ok(true)
    }

    /// Reopens a completed hole. Idempotent; returns whether anything
    /// changed.
    pub fn reopen_hole(&self, hole_number: u32) -> StoreResult<bool> {
        let round = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            if !round.has_hole(hole_number) {
                return Err(StoreError::HoleNotFound {
                    number: hole_number,
                });
            }
            if !round.completed_holes.remove(&hole_number) {
                return Ok(false);
            }
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            snapshot
        };
        self.notify(&round, RoundChange::HoleReopened(hole_number));
        Ok(true)
    }

    /// Points the current-hole index at another hole.
    pub fn update_current_hole_index(&self, new_index: u32) -> StoreResult<()> {
        let round = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            if new_index as usize >= round.holes.len() {
                return Err(StoreError::out_of_range(
                    "current hole index",
                    new_index as usize,
                    0,
                    round.holes.len().saturating_sub(1),
                ));
            }
            round.current_hole_index = new_index;
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            snapshot
        };
        self.notify(&round, RoundChange::CurrentHoleChanged(new_index));
        Ok(())
    }

    /// Appends a hole with the next sequential number and points the
    /// current-hole index at it.
    pub fn add_hole(&self, location: GeoPoint, par: Option<u32>) -> StoreResult<Hole> {
        let (hole, round) = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            let hole = Hole::new(round.next_hole_number(), location, par);
            round.holes.push(hole.clone());
            round.current_hole_index = round.holes.len() as u32 - 1;
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            (hole, snapshot)
        };
        self.notify(&round, RoundChange::HoleAdded(hole.number));
        Ok(hole)
    }

    /// Updates a hole's coordinate, and its par when one is given.
    pub fn update_hole(
        &self,
        hole_number: u32,
        location: GeoPoint,
        par: Option<u32>,
    ) -> StoreResult<()> {
        let round = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            let hole = round
                .holes
                .iter_mut()
                .find(|h| h.number == hole_number)
                .ok_or(StoreError::HoleNotFound {
                    number: hole_number,
                })?;
            hole.location = location;
            if par.is_some() {
                hole.par = par;
            }
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            snapshot
        };
        self.notify(&round, RoundChange::HoleUpdated(hole_number));
        Ok(())
    }

    /// Replaces all targets for a hole with the given locations.
    pub fn upsert_targets(&self, hole_number: u32, locations: &[GeoPoint]) -> StoreResult<()> {
        let round = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            round.replace_targets(hole_number, locations);
            let snapshot = round.clone();
            self.persist_round(&snapshot);
            snapshot
        };
        self.notify(&round, RoundChange::TargetsReplaced(hole_number));
        Ok(())
    }

    /// Retires the active round and returns its final value.
    ///
    /// The caller is responsible for having synchronized beforehand;
    /// see `Replica::end_round` in the engine crate.
    pub fn end_round(&self) -> StoreResult<Round> {
        let round = {
            let mut inner = self.inner.lock();
            if !inner.phase.can_mutate() {
                return Err(StoreError::NoActiveRound);
            }
            let round = inner.round.take().ok_or(StoreError::NoActiveRound)?;
            inner.phase = RoundPhase::Retired;
            round
        };
        if let Err(err) = self.persistence.clear_round() {
            self.record_persistence_failure(&err.to_string());
        }
        self.feed.emit(RoundEvent::RoundEnded);
        Ok(round)
    }

    // --- inbound applies -------------------------------------------------

    /// Replaces the local round with a received snapshot
    /// (last-snapshot-wins), persists it, and notifies observers.
    ///
    /// Applying the same snapshot twice leaves the store in an identical
    /// state. Never signals the change sink.
    pub fn apply_snapshot(&self, round: Round) -> StoreResult<()> {
        {
            let mut inner = self.inner.lock();
            debug!(round_id = %round.id, strokes = round.strokes.len(), "applying snapshot");
            inner.round = Some(round.clone());
            inner.phase = RoundPhase::Active;
            self.persist_round(&round);
        }
        self.feed.emit(RoundEvent::SnapshotApplied);
        Ok(())
    }

    /// Merges a received stroke batch into the active round.
    ///
    /// Strokes with unknown identifiers are appended; already-known
    /// identifiers are ignored, which makes at-least-once delivery safe.
    /// Never replaces the round and never signals the change sink.
    pub fn merge_strokes(&self, strokes: &[Stroke]) -> StoreResult<MergeOutcome> {
        let outcome = {
            let mut inner = self.inner.lock();
            let round = inner.active_round_mut()?;
            let mut outcome = MergeOutcome::default();
            for stroke in strokes {
                if round.contains_stroke(stroke.id) {
                    outcome.ignored += 1;
                } else {
                    round.push_stroke(stroke.clone());
                    outcome.merged += 1;
                }
            }
            if outcome.merged > 0 {
                let snapshot = round.clone();
                self.persist_round(&snapshot);
            }
            outcome
        };
        debug!(merged = outcome.merged, ignored = outcome.ignored, "merged stroke batch");
        self.feed.emit(RoundEvent::StrokesMerged {
            merged: outcome.merged,
            ignored: outcome.ignored,
        });
        Ok(outcome)
    }

    /// Replaces the club list (replace-on-receipt reference data).
    pub fn set_clubs(&self, clubs: Vec<Club>) {
        {
            let mut inner = self.inner.lock();
            inner.clubs = clubs;
            self.persist_reference(&inner.clubs, &inner.club_types);
        }
        self.feed.emit(RoundEvent::ClubsReplaced);
    }

    /// Replaces the club type list (replace-on-receipt reference data).
    pub fn set_club_types(&self, club_types: Vec<ClubType>) {
        {
            let mut inner = self.inner.lock();
            inner.club_types = club_types;
            self.persist_reference(&inner.clubs, &inner.club_types);
        }
        self.feed.emit(RoundEvent::ClubTypesReplaced);
    }

    // --- internals -------------------------------------------------------

    /// Persists the round, degrading gracefully on failure: the
    /// in-memory state keeps the change, the failure is logged, counted,
    /// and surfaced as an event, and the next successful cycle rewrites
    /// the full snapshot.
    fn persist_round(&self, round: &Round) {
        if let Err(err) = self.persistence.save_round(round) {
            self.record_persistence_failure(&err.to_string());
        }
    }

    fn persist_reference(&self, clubs: &[Club], club_types: &[ClubType]) {
        if let Err(err) = self.persistence.save_reference(clubs, club_types) {
            self.record_persistence_failure(&err.to_string());
        }
    }

    fn record_persistence_failure(&self, message: &str) {
        warn!(error = %message, "persistence cycle failed; keeping in-memory state");
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
        self.feed
            .emit(RoundEvent::PersistenceFailed(message.to_string()));
    }

    fn notify(&self, round: &Round, change: RoundChange) {
        self.feed.emit(RoundEvent::Changed(change.clone()));
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink.round_changed(round, &change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryPersistence;
    use proptest::prelude::*;

    fn open_store() -> RoundStore {
        RoundStore::open(Arc::new(MemoryPersistence::new())).unwrap()
    }

    fn start_round_with_holes(store: &RoundStore, count: u32) -> Round {
        let holes = (1..=count)
            .map(|n| Hole::new(n, GeoPoint::new(n as f64, 0.0), Some(4)))
            .collect();
        store.start_round("course-1", "Pebble Creek", holes).unwrap()
    }

    fn add_stroke(store: &RoundStore, hole: u32) -> Stroke {
        store
            .add_stroke(
                hole,
                GeoPoint::new(0.0, 0.0),
                ClubId::new(),
                StrokeAnnotations::default(),
            )
            .unwrap()
    }

    #[test]
    fn mutations_require_active_round() {
        let store = open_store();
        assert_eq!(store.phase(), RoundPhase::NoRound);

        let result = store.add_stroke(
            1,
            GeoPoint::new(0.0, 0.0),
            ClubId::new(),
            StrokeAnnotations::default(),
        );
        assert!(matches!(result, Err(StoreError::NoActiveRound)));
        assert!(matches!(
            store.complete_hole(1),
            Err(StoreError::NoActiveRound)
        ));
        assert!(matches!(store.end_round(), Err(StoreError::NoActiveRound)));
    }

    #[test]
    fn stroke_numbers_are_per_hole() {
        let store = open_store();
        start_round_with_holes(&store, 2);

        let s1 = add_stroke(&store, 1);
        let s2 = add_stroke(&store, 1);
        let s3 = add_stroke(&store, 2);

        assert_eq!(s1.stroke_number, 1);
        assert_eq!(s2.stroke_number, 2);
        assert_eq!(s3.stroke_number, 1);
    }

    #[test]
    fn delete_is_tolerant_of_duplicates() {
        let store = open_store();
        start_round_with_holes(&store, 1);
        let stroke = add_stroke(&store, 1);

        assert!(store.delete_stroke(stroke.id).unwrap());
        assert!(!store.delete_stroke(stroke.id).unwrap());
    }

    #[test]
    fn renumber_reorders_the_hole() {
        let store = open_store();
        start_round_with_holes(&store, 2);
        let first = add_stroke(&store, 1);
        let second = add_stroke(&store, 1);

        store.renumber_stroke(second.id, 1).unwrap();

        let round = store.current_round().unwrap();
        let order: Vec<(StrokeId, u32)> = round
            .strokes_for_hole(1)
            .iter()
            .map(|s| (s.id, s.stroke_number))
            .collect();
        assert_eq!(order, vec![(second.id, 1), (first.id, 2)]);
    }

    #[test]
    fn renumber_validates_range() {
        let store = open_store();
        start_round_with_holes(&store, 1);
        let stroke = add_stroke(&store, 1);

        assert!(matches!(
            store.renumber_stroke(stroke.id, 0),
            Err(StoreError::OutOfRange { .. })
        ));
        assert!(matches!(
            store.renumber_stroke(stroke.id, 2),
            Err(StoreError::OutOfRange { .. })
        ));
        assert!(matches!(
            store.renumber_stroke(StrokeId::new(), 1),
            Err(StoreError::StrokeNotFound { .. })
        ));
    }

    #[test]
    fn complete_and_reopen_are_idempotent() {
        let store = open_store();
        start_round_with_holes(&store, 2);

        assert!(store.complete_hole(1).unwrap());
        assert!(!store.complete_hole(1).unwrap());
        assert!(store.reopen_hole(1).unwrap());
        assert!(!store.reopen_hole(1).unwrap());

        assert!(matches!(
            store.complete_hole(9),
            Err(StoreError::HoleNotFound { number: 9 })
        ));
    }

    #[test]
    fn current_hole_index_bounds() {
        let store = open_store();
        start_round_with_holes(&store, 3);

        store.update_current_hole_index(2).unwrap();
        assert_eq!(store.current_round().unwrap().current_hole_index, 2);

        assert!(matches!(
            store.update_current_hole_index(3),
            Err(StoreError::OutOfRange { .. })
        ));
    }

    #[test]
    fn add_hole_points_current_index_at_it() {
        let store = open_store();
        store.start_round("c1", "Quick Round", Vec::new()).unwrap();

        let h1 = store.add_hole(GeoPoint::new(1.0, 1.0), Some(4)).unwrap();
        let h2 = store.add_hole(GeoPoint::new(2.0, 2.0), None).unwrap();

        assert_eq!(h1.number, 1);
        assert_eq!(h2.number, 2);
        assert_eq!(store.current_round().unwrap().current_hole_index, 1);
    }

    #[test]
    fn update_hole_keeps_par_when_none_given() {
        let store = open_store();
        start_round_with_holes(&store, 1);

        store
            .update_hole(1, GeoPoint::new(9.0, 9.0), None)
            .unwrap();
        let round = store.current_round().unwrap();
        assert_eq!(round.hole(1).unwrap().par, Some(4));
        assert_eq!(round.hole(1).unwrap().location, GeoPoint::new(9.0, 9.0));

        store.update_hole(1, GeoPoint::new(9.0, 9.0), Some(5)).unwrap();
        assert_eq!(store.current_round().unwrap().hole(1).unwrap().par, Some(5));

        assert!(matches!(
            store.update_hole(7, GeoPoint::new(0.0, 0.0), None),
            Err(StoreError::HoleNotFound { number: 7 })
        ));
    }

    #[test]
    fn snapshot_application_is_idempotent() {
        let store = open_store();
        let mut round = Round::new("c1", "Course", Vec::new());
        round.holes.push(Hole::new(1, GeoPoint::new(0.0, 0.0), None));
        round.completed_holes.insert(1);

        store.apply_snapshot(round.clone()).unwrap();
        let after_first = store.current_round().unwrap();

        store.apply_snapshot(round).unwrap();
        let after_second = store.current_round().unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(store.phase(), RoundPhase::Active);
    }

    #[test]
    fn merge_ignores_known_ids() {
        let store = open_store();
        start_round_with_holes(&store, 1);
        let local = add_stroke(&store, 1);

        let remote = Stroke::new(
            1,
            2,
            GeoPoint::new(5.0, 5.0),
            ClubId::new(),
            StrokeAnnotations::default(),
        );

        let outcome = store
            .merge_strokes(&[local.clone(), remote.clone()])
            .unwrap();
        assert_eq!(outcome, MergeOutcome { merged: 1, ignored: 1 });

        // Re-delivery of the whole batch is a no-op.
        let outcome = store.merge_strokes(&[local, remote]).unwrap();
        assert_eq!(outcome, MergeOutcome { merged: 0, ignored: 2 });
        assert_eq!(store.current_round().unwrap().strokes.len(), 2);
    }

    #[test]
    fn merge_preserves_structural_state() {
        let store = open_store();
        start_round_with_holes(&store, 2);
        store.complete_hole(1).unwrap();

        let remote = Stroke::new(
            2,
            1,
            GeoPoint::new(5.0, 5.0),
            ClubId::new(),
            StrokeAnnotations::default(),
        );
        store.merge_strokes(&[remote]).unwrap();

        let round = store.current_round().unwrap();
        assert!(round.completed_holes.contains(&1));
        assert_eq!(round.stroke_count_for_hole(2), 1);
    }

    #[test]
    fn store_restores_from_persistence() {
        let persistence = Arc::new(MemoryPersistence::new());
        let round_id;
        {
            let store = RoundStore::open(persistence.clone()).unwrap();
            let round = start_round_with_holes(&store, 2);
            round_id = round.id;
            add_stroke(&store, 1);
        }

        let store = RoundStore::open(persistence).unwrap();
        assert_eq!(store.phase(), RoundPhase::Active);
        let round = store.current_round().unwrap();
        assert_eq!(round.id, round_id);
        assert_eq!(round.stroke_count_for_hole(1), 1);
    }

    #[test]
    fn end_round_retires_and_clears() {
        let persistence = Arc::new(MemoryPersistence::new());
        let store = RoundStore::open(persistence.clone()).unwrap();
        start_round_with_holes(&store, 1);

        let ended = store.end_round().unwrap();
        assert_eq!(store.phase(), RoundPhase::Retired);
        assert!(store.current_round().is_none());
        assert_eq!(ended.holes.len(), 1);
        assert!(persistence.load_round().unwrap().is_none());

        // An inbound snapshot starts a fresh active round.
        store.apply_snapshot(Round::new("c2", "Next", Vec::new())).unwrap();
        assert_eq!(store.phase(), RoundPhase::Active);
    }

    #[test]
    fn persistence_failure_keeps_in_memory_state() {
        let persistence = Arc::new(MemoryPersistence::new());
        let store = RoundStore::open(persistence.clone()).unwrap();
        start_round_with_holes(&store, 1);

        persistence.set_fail_writes(true);
        let rx = store.subscribe();
        let stroke = add_stroke(&store, 1);

        // The mutation survived in memory and the failure was surfaced.
        assert!(store.current_round().unwrap().contains_stroke(stroke.id));
        assert_eq!(store.persistence_failures(), 1);
        let events: Vec<RoundEvent> = rx.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, RoundEvent::PersistenceFailed(_))));

        // The next successful cycle rewrites the full state.
        persistence.set_fail_writes(false);
        add_stroke(&store, 1);
        let saved = persistence.load_round().unwrap().unwrap();
        assert!(saved.contains_stroke(stroke.id));
    }

    #[test]
    fn events_and_sink_fire_for_mutations() {
        struct Recorder(Mutex<Vec<RoundChange>>);
        impl ChangeSink for Recorder {
            fn round_changed(&self, _round: &Round, change: &RoundChange) {
                self.0.lock().push(change.clone());
            }
        }

        let store = open_store();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        store.attach_sink(recorder.clone());

        start_round_with_holes(&store, 1);
        add_stroke(&store, 1);
        store.complete_hole(1).unwrap();

        let changes = recorder.0.lock();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0], RoundChange::RoundStarted);
        assert!(matches!(changes[1], RoundChange::StrokeAdded(_)));
        assert_eq!(changes[2], RoundChange::HoleCompleted(1));
    }

    #[test]
    fn inbound_applies_do_not_signal_sink() {
        struct Counter(AtomicU64);
        impl ChangeSink for Counter {
            fn round_changed(&self, _round: &Round, _change: &RoundChange) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let store = open_store();
        let counter = Arc::new(Counter(AtomicU64::new(0)));
        store.attach_sink(counter.clone());

        store
            .apply_snapshot(Round::new("c1", "Course", vec![Hole::new(
                1,
                GeoPoint::new(0.0, 0.0),
                None,
            )]))
            .unwrap();
        let stroke = Stroke::new(
            1,
            1,
            GeoPoint::new(0.0, 0.0),
            ClubId::new(),
            StrokeAnnotations::default(),
        );
        store.merge_strokes(&[stroke]).unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reference_data_replaces_wholesale() {
        let store = open_store();
        let ty = ClubType {
            id: roundlink_model::ClubTypeId::new(),
            name: "Iron".into(),
        };
        store.set_club_types(vec![ty.clone()]);
        store.set_clubs(vec![Club {
            id: ClubId::new(),
            name: "7 Iron".into(),
            club_type_id: ty.id,
        }]);
        assert_eq!(store.clubs().len(), 1);

        store.set_clubs(Vec::new());
        assert!(store.clubs().is_empty());
        assert_eq!(store.club_types().len(), 1);
    }

    /// One valid operation against the current store state.
    #[derive(Debug, Clone)]
    enum Op {
        Add { hole: u8 },
        Delete { pick: u8 },
        Renumber { pick: u8, to: u8 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u8..=3).prop_map(|hole| Op::Add { hole }),
            proptest::num::u8::ANY.prop_map(|pick| Op::Delete { pick }),
            (proptest::num::u8::ANY, proptest::num::u8::ANY)
                .prop_map(|(pick, to)| Op::Renumber { pick, to }),
        ]
    }

    proptest! {
        /// After any sequence of valid add/delete/renumber calls, every
        /// hole's stroke numbers are exactly 1..=n and ids are unique.
        #[test]
        fn stroke_numbering_invariant(ops in proptest::collection::vec(op_strategy(), 1..40)) {
            let store = open_store();
            start_round_with_holes(&store, 3);

            for op in ops {
                let round = store.current_round().unwrap();
                match op {
                    Op::Add { hole } => {
                        add_stroke(&store, hole as u32);
                    }
                    Op::Delete { pick } => {
                        if !round.strokes.is_empty() {
                            let id = round.strokes[pick as usize % round.strokes.len()].id;
                            store.delete_stroke(id).unwrap();
                        }
                    }
                    Op::Renumber { pick, to } => {
                        if !round.strokes.is_empty() {
                            let stroke = &round.strokes[pick as usize % round.strokes.len()];
                            let count = round.stroke_count_for_hole(stroke.hole_number);
                            let target = to as u32 % count + 1;
                            store.renumber_stroke(stroke.id, target).unwrap();
                        }
                    }
                }
            }

            let round = store.current_round().unwrap();
            let mut seen = std::collections::HashSet::new();
            for stroke in &round.strokes {
                prop_assert!(seen.insert(stroke.id));
            }
            for hole in 1..=3u32 {
                let numbers: Vec<u32> = round
                    .strokes_for_hole(hole)
                    .iter()
                    .map(|s| s.stroke_number)
                    .collect();
                let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
                prop_assert_eq!(numbers, expected);
            }
        }
    }
}
