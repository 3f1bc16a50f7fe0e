//! Protocol messages exchanged between replicas.

use roundlink_model::{Club, ClubType, Round, RoundId, Stroke};
use serde::{Deserialize, Serialize};

/// A batch of strokes committed on one replica but not yet acknowledged
/// by the other.
///
/// Receivers merge by stroke identifier: unknown ids are appended to the
/// active round, known ids are ignored. The batch never replaces the
/// round, so it cannot clobber structural state with a stale view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeBatch {
    /// The round the sender recorded these strokes against.
    ///
    /// Informational: the receiver merges into whatever round is active,
    /// since a quick-started round on one replica may since have been
    /// replaced by the other replica's snapshot.
    pub round_id: RoundId,
    /// The strokes, in enqueue order.
    pub strokes: Vec<Stroke>,
}

impl StrokeBatch {
    /// Creates a new batch.
    #[must_use]
    pub fn new(round_id: RoundId, strokes: Vec<Stroke>) -> Self {
        Self { round_id, strokes }
    }

    /// Returns the number of strokes in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// Returns true if the batch carries no strokes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

/// A replication message.
///
/// Messages are self-describing and carry no sequence numbers: snapshots
/// always win wholesale, and strokes merge idempotently by id, so no
/// delivery order needs to be preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Full round state; the receiver replaces its local round.
    RoundSnapshot(Round),
    /// Incremental strokes; the receiver merges by stroke id and
    /// acknowledges delivery.
    StrokeBatch(StrokeBatch),
    /// Replace-on-receipt club list.
    ClubsPush(Vec<Club>),
    /// Replace-on-receipt club type list.
    ClubTypesPush(Vec<ClubType>),
}

impl SyncMessage {
    /// Returns a short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::RoundSnapshot(_) => "round_snapshot",
            SyncMessage::StrokeBatch(_) => "stroke_batch",
            SyncMessage::ClubsPush(_) => "clubs_push",
            SyncMessage::ClubTypesPush(_) => "club_types_push",
        }
    }

    /// Returns true for messages whose delivery must be acknowledged
    /// and retried until it succeeds.
    #[must_use]
    pub fn requires_ack(&self) -> bool {
        matches!(self, SyncMessage::StrokeBatch(_))
    }
}
