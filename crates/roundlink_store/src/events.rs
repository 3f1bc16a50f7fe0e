//! Change descriptions, observer events, and the sync-layer seam.
//!
//! The store reports successful local mutations in two directions:
//! - to the [`ChangeSink`] (the sync layer), which decides what to
//!   transmit — a full snapshot for structural changes, the pending
//!   queue for strokes
//! - to [`EventFeed`] subscribers (UI, telemetry), which also see
//!   inbound applies and persistence failures
//!
//! Inbound applies never reach the sink; a received change must not be
//! re-broadcast to its sender.

use parking_lot::RwLock;
use roundlink_model::{Round, Stroke, StrokeId};
use std::sync::mpsc::{self, Receiver, Sender};

/// A successful local mutation, as reported to the sync layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundChange {
    /// A new round was started.
    RoundStarted,
    /// A stroke was recorded.
    StrokeAdded(Stroke),
    /// A stroke was removed.
    StrokeDeleted(StrokeId),
    /// A stroke was moved within its hole.
    StrokeRenumbered {
        /// The stroke that moved.
        id: StrokeId,
        /// Its new 1-based position.
        number: u32,
    },
    /// A hole was appended.
    HoleAdded(u32),
    /// A hole's coordinate or par changed.
    HoleUpdated(u32),
    /// A hole was marked complete.
    HoleCompleted(u32),
    /// A hole was reopened.
    HoleReopened(u32),
    /// The current-hole pointer moved.
    CurrentHoleChanged(u32),
    /// A hole's target set was replaced.
    TargetsReplaced(u32),
}

impl RoundChange {
    /// Returns true for changes replicated by full-round snapshot.
    ///
    /// Stroke-only changes instead travel through the pending queue as
    /// independently resendable units.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            RoundChange::StrokeAdded(_)
                | RoundChange::StrokeDeleted(_)
                | RoundChange::StrokeRenumbered { .. }
        )
    }
}

/// An event observed on the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// A local mutation succeeded.
    Changed(RoundChange),
    /// An inbound snapshot replaced the round.
    SnapshotApplied,
    /// An inbound stroke batch was merged.
    StrokesMerged {
        /// Strokes appended (previously unknown ids).
        merged: u32,
        /// Strokes ignored (already-known ids).
        ignored: u32,
    },
    /// The club list was replaced.
    ClubsReplaced,
    /// The club type list was replaced.
    ClubTypesReplaced,
    /// The round was retired.
    RoundEnded,
    /// A persistence cycle failed; in-memory state kept the change.
    PersistenceFailed(String),
}

/// The seam through which local mutations reach the sync layer.
///
/// Called after the mutation has been applied and persisted, with the
/// store's lock released and a cloned round value, so implementations
/// may freely read the round without calling back into the store.
pub trait ChangeSink: Send + Sync {
    /// Reports one successful local mutation.
    fn round_changed(&self, round: &Round, change: &RoundChange);
}

/// Distributes store events to subscribers.
///
/// - Emits in mutation order
/// - Supports multiple subscribers
/// - Disconnected subscribers are dropped on the next emit
pub struct EventFeed {
    subscribers: RwLock<Vec<Sender<RoundEvent>>>,
}

impl EventFeed {
    /// Creates a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> Receiver<RoundEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: RoundEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn structural_classification() {
        assert!(RoundChange::RoundStarted.is_structural());
        assert!(RoundChange::HoleCompleted(3).is_structural());
        assert!(RoundChange::CurrentHoleChanged(1).is_structural());
        assert!(RoundChange::TargetsReplaced(2).is_structural());

        assert!(!RoundChange::StrokeDeleted(StrokeId::new()).is_structural());
        assert!(!RoundChange::StrokeRenumbered {
            id: StrokeId::new(),
            number: 1
        }
        .is_structural());
    }

    #[test]
    fn emit_and_receive() {
        let feed = EventFeed::new();
        let rx = feed.subscribe();

        feed.emit(RoundEvent::SnapshotApplied);
        let received = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received, RoundEvent::SnapshotApplied);
    }

    #[test]
    fn multiple_subscribers() {
        let feed = EventFeed::new();
        let rx1 = feed.subscribe();
        let rx2 = feed.subscribe();

        feed.emit(RoundEvent::RoundEnded);
        assert_eq!(rx1.recv().unwrap(), RoundEvent::RoundEnded);
        assert_eq!(rx2.recv().unwrap(), RoundEvent::RoundEnded);
    }

    #[test]
    fn subscriber_cleanup() {
        let feed = EventFeed::new();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);
        feed.emit(RoundEvent::ClubsReplaced);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
