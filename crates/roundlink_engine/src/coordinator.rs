//! The sync coordinator: outbound replication policy and inbound apply
//! policy.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::queue::PendingOperationQueue;
use crate::transport::Transport;
use parking_lot::RwLock;
use roundlink_model::Round;
use roundlink_protocol::SyncMessage;
use roundlink_store::{ChangeSink, RoundChange, RoundStore, StoreError};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, warn};

/// Statistics about replication activity.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Snapshots delivered to the peer.
    pub snapshots_sent: u64,
    /// Snapshots whose delivery failed (repaired by a later snapshot).
    pub snapshots_dropped: u64,
    /// Snapshots received and applied.
    pub snapshots_applied: u64,
    /// Strokes received and appended.
    pub strokes_merged: u64,
    /// Strokes received and ignored as already known.
    pub strokes_ignored: u64,
    /// Snapshots that replaced local state while local strokes were
    /// still unacknowledged.
    pub divergent_snapshots: u64,
    /// Strokes currently awaiting acknowledgment.
    pub pending_strokes: u64,
    /// Consecutive failed flush attempts.
    pub flush_failures: u32,
    /// Last error message, if any.
    pub last_error: Option<String>,
}

/// Decides what to transmit after a local mutation and how to apply an
/// inbound message.
///
/// One coordinator exists per replica, constructed explicitly with its
/// store, queue, and transport ([`SyncCoordinator::start`]); there is
/// no global shared instance.
///
/// Conflict resolution is whole-object replace at snapshot granularity
/// and merge-by-id at stroke granularity; both live entirely behind
/// this type, so a finer-grained merge could be introduced without
/// touching [`RoundStore`] or the [`Transport`] contract.
pub struct SyncCoordinator {
    config: SyncConfig,
    store: Arc<RoundStore>,
    queue: PendingOperationQueue,
    transport: Arc<dyn Transport>,
    stats: Arc<RwLock<SyncStats>>,
}

/// Adapter so the store holds no strong reference back to the
/// coordinator.
struct CoordinatorSink(Weak<SyncCoordinator>);

impl ChangeSink for CoordinatorSink {
    fn round_changed(&self, round: &Round, change: &RoundChange) {
        if let Some(coordinator) = self.0.upgrade() {
            coordinator.on_local_change(round, change);
        }
    }
}

impl SyncCoordinator {
    /// Wires a coordinator to its collaborators and starts reacting to
    /// local changes, inbound messages, and reachability transitions.
    pub fn start(
        config: SyncConfig,
        store: Arc<RoundStore>,
        queue: PendingOperationQueue,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let coordinator = Arc::new(Self {
            config,
            store: Arc::clone(&store),
            queue,
            transport: Arc::clone(&transport),
            stats: Arc::new(RwLock::new(SyncStats::default())),
        });

        let weak = Arc::downgrade(&coordinator);
        transport.set_message_handler(Arc::new(move |message| {
            weak.upgrade()
                .map(|c| c.handle_inbound(message))
                .unwrap_or(false)
        }));

        let weak = Arc::downgrade(&coordinator);
        transport.set_reachability_handler(Arc::new(move |reachable| {
            if !reachable {
                return;
            }
            if let Some(coordinator) = weak.upgrade() {
                debug!(
                    role = coordinator.config.role.as_str(),
                    "peer reachable again; flushing pending strokes"
                );
                coordinator.flush_pending();
            }
        }));

        store.attach_sink(Arc::new(CoordinatorSink(Arc::downgrade(&coordinator))));
        coordinator
    }

    /// Returns a snapshot of the replication statistics.
    pub fn stats(&self) -> SyncStats {
        let mut stats = self.stats.read().clone();
        stats.pending_strokes = self.queue.len() as u64;
        stats.flush_failures = self.queue.consecutive_failures();
        stats
    }

    /// Returns the pending queue depth.
    pub fn pending_strokes(&self) -> usize {
        self.queue.len()
    }

    /// Fire-and-forget flush of the pending queue.
    pub fn flush_pending(&self) {
        if let Some(round_id) = self.store.round_id() {
            self.queue.flush(&self.transport, round_id);
        }
    }

    /// Broadcasts the current round as a snapshot, best-effort.
    pub fn push_snapshot(&self) {
        if let Some(round) = self.store.current_round() {
            self.send_snapshot(round);
        }
    }

    /// Fully synchronizes with bounded retry: broadcasts the round,
    /// then drains the pending queue.
    ///
    /// Used before retiring a round, when the final value must have
    /// reached the peer.
    pub fn sync_now(&self) -> SyncResult<()> {
        let round = self
            .store
            .current_round()
            .ok_or(SyncError::Store(StoreError::NoActiveRound))?;

        self.send_snapshot_blocking(&round)?;
        self.queue
            .flush_with_retry(&self.transport, round.id, &self.config.retry)
    }

    /// Outbound policy for one successful local mutation.
    fn on_local_change(&self, round: &Round, change: &RoundChange) {
        if change.is_structural() {
            // Full-state broadcast; a lost snapshot is repaired by the
            // next one.
            self.send_snapshot(round.clone());
            return;
        }

        match change {
            RoundChange::StrokeAdded(stroke) => {
                self.queue.enqueue(stroke.clone());
                self.queue.flush(&self.transport, round.id);
            }
            RoundChange::StrokeDeleted(id) => {
                // Never resend a stroke the user has deleted. The
                // deletion itself reaches the peer with the next
                // snapshot.
                if self.queue.remove(*id) {
                    debug!(stroke = %id, "dropped pending copy of deleted stroke");
                }
            }
            RoundChange::StrokeRenumbered { id, .. } => {
                if let Some(stroke) = round.stroke(*id) {
                    if self.queue.replace(stroke.clone()) {
                        debug!(stroke = %id, "updated pending copy of renumbered stroke");
                    }
                }
            }
            _ => {}
        }
    }

    /// Inbound policy. The returned bool is the delivery acknowledgment
    /// reported back to the sender.
    fn handle_inbound(&self, message: SyncMessage) -> bool {
        match message {
            SyncMessage::RoundSnapshot(round) => {
                if !self.queue.is_empty() {
                    // Local strokes are still unacknowledged; the
                    // replace below may discard other local edits the
                    // peer has not seen. Resolution policy is
                    // unchanged, but the case is observable.
                    warn!(
                        role = self.config.role.as_str(),
                        pending = self.queue.len(),
                        "snapshot received while local edits are unsynchronized"
                    );
                    self.stats.write().divergent_snapshots += 1;
                }
                match self.store.apply_snapshot(round) {
                    Ok(()) => {
                        self.stats.write().snapshots_applied += 1;
                        true
                    }
                    Err(err) => {
                        self.record_error(&err.to_string());
                        false
                    }
                }
            }
            SyncMessage::StrokeBatch(batch) => {
                if let Some(local_id) = self.store.round_id() {
                    if local_id != batch.round_id {
                        // A quick-started round on the sender may since
                        // have been replaced by our snapshot; merge by
                        // id into whatever round is active.
                        debug!(
                            batch_round = %batch.round_id,
                            local_round = %local_id,
                            "stroke batch from a different round instance"
                        );
                    }
                }
                match self.store.merge_strokes(&batch.strokes) {
                    Ok(outcome) => {
                        let mut stats = self.stats.write();
                        stats.strokes_merged += u64::from(outcome.merged);
                        stats.strokes_ignored += u64::from(outcome.ignored);
                        true
                    }
                    Err(StoreError::NoActiveRound) => {
                        // Nack so the batch stays queued at the sender
                        // until a snapshot has established the round.
                        debug!("stroke batch arrived with no active round");
                        false
                    }
                    Err(err) => {
                        self.record_error(&err.to_string());
                        false
                    }
                }
            }
            SyncMessage::ClubsPush(clubs) => {
                self.store.set_clubs(clubs);
                true
            }
            SyncMessage::ClubTypesPush(club_types) => {
                self.store.set_club_types(club_types);
                true
            }
        }
    }

    fn send_snapshot(&self, round: Round) {
        let stats = Arc::clone(&self.stats);
        self.transport.send(
            SyncMessage::RoundSnapshot(round),
            Box::new(move |success| {
                let mut stats = stats.write();
                if success {
                    stats.snapshots_sent += 1;
                } else {
                    stats.snapshots_dropped += 1;
                }
            }),
        );
    }

    fn send_snapshot_blocking(&self, round: &Round) -> SyncResult<()> {
        let retry = &self.config.retry;
        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                thread::sleep(retry.delay_for_attempt(attempt));
            }

            let (tx, rx) = mpsc::channel();
            self.transport.send(
                SyncMessage::RoundSnapshot(round.clone()),
                Box::new(move |success| {
                    let _ = tx.send(success);
                }),
            );
            if rx.recv().unwrap_or(false) {
                self.stats.write().snapshots_sent += 1;
                return Ok(());
            }
            self.stats.write().snapshots_dropped += 1;
        }

        Err(SyncError::TransportUnavailable {
            attempts: retry.max_attempts,
        })
    }

    fn record_error(&self, message: &str) {
        warn!(role = self.config.role.as_str(), error = %message, "inbound apply failed");
        self.stats.write().last_error = Some(message.to_string());
    }
}
