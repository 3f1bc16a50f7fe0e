//! Persistence abstraction.
//!
//! Both the active round and the pending stroke queue are durable: the
//! round so a replica restarts into its last known state, the queue so
//! unacknowledged strokes survive a process restart and are retried.
//! Backends store opaque CBOR produced by `roundlink_protocol`, the same
//! schema used on the wire.

use parking_lot::Mutex;
use roundlink_model::{Club, ClubType, Round, Stroke};
use roundlink_protocol::{from_cbor, to_cbor, ProtocolError};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors that can occur in durable storage.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encode/decode failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// Another process holds the replica directory lock.
    #[error("replica directory locked: another process has exclusive access")]
    Locked,
}

impl From<ProtocolError> for PersistenceError {
    fn from(err: ProtocolError) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Reference data stored alongside the round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ReferenceData {
    pub clubs: Vec<Club>,
    pub club_types: Vec<ClubType>,
}

/// Durable storage for one replica.
///
/// Implementations must be safe to call from any thread; callers
/// serialize writes (the store's internal lock is the single writer).
pub trait Persistence: Send + Sync {
    /// Persists the active round.
    fn save_round(&self, round: &Round) -> PersistenceResult<()>;

    /// Loads the active round, if one was persisted.
    fn load_round(&self) -> PersistenceResult<Option<Round>>;

    /// Removes the persisted active round.
    fn clear_round(&self) -> PersistenceResult<()>;

    /// Persists the pending stroke buffer.
    fn save_pending(&self, strokes: &[Stroke]) -> PersistenceResult<()>;

    /// Loads the pending stroke buffer.
    fn load_pending(&self) -> PersistenceResult<Vec<Stroke>>;

    /// Persists club reference data.
    fn save_reference(&self, clubs: &[Club], club_types: &[ClubType]) -> PersistenceResult<()>;

    /// Loads club reference data.
    fn load_reference(&self) -> PersistenceResult<(Vec<Club>, Vec<ClubType>)>;
}

/// In-memory persistence for tests and ephemeral replicas.
///
/// Values are stored encoded, so the codec path is exercised the same
/// way the file backend exercises it. Write failures can be injected to
/// test the store's persistence-failure handling.
#[derive(Default)]
pub struct MemoryPersistence {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    round: Option<Vec<u8>>,
    pending: Option<Vec<u8>>,
    reference: Option<Vec<u8>>,
    fail_writes: bool,
}

impl MemoryPersistence {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    fn check_write(&self) -> PersistenceResult<()> {
        if self.state.lock().fail_writes {
            return Err(PersistenceError::Io(io::Error::other(
                "injected write failure",
            )));
        }
        Ok(())
    }
}

impl Persistence for MemoryPersistence {
    fn save_round(&self, round: &Round) -> PersistenceResult<()> {
        self.check_write()?;
        let bytes = to_cbor(round)?;
        self.state.lock().round = Some(bytes);
        Ok(())
    }

    fn load_round(&self) -> PersistenceResult<Option<Round>> {
        match &self.state.lock().round {
            Some(bytes) => Ok(Some(from_cbor(bytes)?)),
            None => Ok(None),
        }
    }

    fn clear_round(&self) -> PersistenceResult<()> {
        self.check_write()?;
        self.state.lock().round = None;
        Ok(())
    }

    fn save_pending(&self, strokes: &[Stroke]) -> PersistenceResult<()> {
        self.check_write()?;
        let bytes = to_cbor(&strokes.to_vec())?;
        self.state.lock().pending = Some(bytes);
        Ok(())
    }

    fn load_pending(&self) -> PersistenceResult<Vec<Stroke>> {
        match &self.state.lock().pending {
            Some(bytes) => Ok(from_cbor(bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_reference(&self, clubs: &[Club], club_types: &[ClubType]) -> PersistenceResult<()> {
        self.check_write()?;
        let data = ReferenceData {
            clubs: clubs.to_vec(),
            club_types: club_types.to_vec(),
        };
        let bytes = to_cbor(&data)?;
        self.state.lock().reference = Some(bytes);
        Ok(())
    }

    fn load_reference(&self) -> PersistenceResult<(Vec<Club>, Vec<ClubType>)> {
        match &self.state.lock().reference {
            Some(bytes) => {
                let data: ReferenceData = from_cbor(bytes)?;
                Ok((data.clubs, data.club_types))
            }
            None => Ok((Vec::new(), Vec::new())),
        }
    }
}
