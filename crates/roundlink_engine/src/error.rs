//! Error types for the sync engine.

use roundlink_protocol::ProtocolError;
use roundlink_store::{PersistenceError, StoreError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Store validation or state error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Durable storage failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Message encode/decode failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Delivery to the peer failed and bounded retry was exhausted.
    ///
    /// Not user-visible as an error on the trigger-driven path: the
    /// operations stay queued and are retried on the next trigger. Only
    /// blocking callers (`sync_now`, `flush_with_retry`) see this.
    #[error("peer unreachable: delivery failed after {attempts} attempts")]
    TransportUnavailable {
        /// How many delivery attempts were made.
        attempts: u32,
    },

    /// The location provider has no current coordinate.
    #[error("current location unavailable")]
    LocationUnavailable,
}

impl SyncError {
    /// Returns true if the operation can be retried later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::TransportUnavailable { .. })
    }
}
