//! The pending operation queue.
//!
//! Buffers strokes that have been locally committed but not yet
//! acknowledged by the remote replica, and retries their delivery.
//! The buffer itself is persisted, so unacknowledged strokes survive a
//! process restart. Because stroke identifiers are stable and the
//! receiver merges by id, resending is always safe (at-least-once
//! delivery with idempotent effect).

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::Transport;
use parking_lot::Mutex;
use roundlink_model::{RoundId, Stroke, StrokeId};
use roundlink_protocol::{StrokeBatch, SyncMessage};
use roundlink_store::Persistence;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

struct QueueInner {
    persistence: Arc<dyn Persistence>,
    entries: Mutex<VecDeque<Stroke>>,
    in_flight: AtomicBool,
    consecutive_failures: AtomicU32,
}

impl QueueInner {
    fn persist(&self, entries: &VecDeque<Stroke>) {
        let strokes: Vec<Stroke> = entries.iter().cloned().collect();
        if let Err(err) = self.persistence.save_pending(&strokes) {
            warn!(error = %err, "failed to persist pending queue; strokes remain in memory");
        }
    }

    /// Sends everything currently buffered as one batch.
    ///
    /// At most one batch is in flight; a flush while one is outstanding
    /// reports `false` to `notify` and leaves the retry to the next
    /// trigger. On acknowledged delivery, exactly the strokes included
    /// in the attempt are cleared; strokes enqueued mid-flight stay and
    /// a follow-up flush is started for them.
    fn flush(inner: &Arc<Self>, transport: &Arc<dyn Transport>, round_id: RoundId, notify: Option<Sender<bool>>) {
        if inner.in_flight.swap(true, Ordering::SeqCst) {
            if let Some(tx) = notify {
                let _ = tx.send(false);
            }
            return;
        }

        let batch: Vec<Stroke> = inner.entries.lock().iter().cloned().collect();
        if batch.is_empty() {
            inner.in_flight.store(false, Ordering::SeqCst);
            if let Some(tx) = notify {
                let _ = tx.send(true);
            }
            return;
        }

        let attempt_ids: Vec<StrokeId> = batch.iter().map(|s| s.id).collect();
        debug!(strokes = batch.len(), "flushing pending strokes");

        let inner_cb = Arc::clone(inner);
        let transport_cb = Arc::clone(transport);
        let message = SyncMessage::StrokeBatch(StrokeBatch::new(round_id, batch));
        transport.send(
            message,
            Box::new(move |success| {
                let more = if success {
                    let mut entries = inner_cb.entries.lock();
                    entries.retain(|s| !attempt_ids.contains(&s.id));
                    inner_cb.persist(&entries);
                    let more = !entries.is_empty();
                    drop(entries);
                    inner_cb.consecutive_failures.store(0, Ordering::SeqCst);
                    more
                } else {
                    let failures = inner_cb.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!(failures, "stroke batch not acknowledged; strokes remain queued");
                    false
                };
                inner_cb.in_flight.store(false, Ordering::SeqCst);

                if more {
                    // Strokes arrived while the batch was in flight.
                    Self::flush(&inner_cb, &transport_cb, round_id, None);
                }
                if let Some(tx) = notify {
                    let _ = tx.send(success);
                }
            }),
        );
    }
}

/// Durable, ordered buffer of unacknowledged strokes.
///
/// Cheap to clone; clones share the same buffer.
#[derive(Clone)]
pub struct PendingOperationQueue {
    inner: Arc<QueueInner>,
}

impl PendingOperationQueue {
    /// Opens the queue, restoring any persisted strokes.
    pub fn open(persistence: Arc<dyn Persistence>) -> SyncResult<Self> {
        let entries: VecDeque<Stroke> = persistence.load_pending()?.into();
        if !entries.is_empty() {
            debug!(strokes = entries.len(), "restored pending strokes from disk");
        }
        Ok(Self {
            inner: Arc::new(QueueInner {
                persistence,
                entries: Mutex::new(entries),
                in_flight: AtomicBool::new(false),
                consecutive_failures: AtomicU32::new(0),
            }),
        })
    }

    /// Appends a stroke and persists the buffer.
    pub fn enqueue(&self, stroke: Stroke) {
        let mut entries = self.inner.entries.lock();
        entries.push_back(stroke);
        self.inner.persist(&entries);
    }

    /// Removes a pending stroke by id (the stroke was deleted locally
    /// before it was ever acknowledged). Returns whether it was present.
    pub fn remove(&self, id: StrokeId) -> bool {
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|s| s.id != id);
        let removed = entries.len() != before;
        if removed {
            self.inner.persist(&entries);
        }
        removed
    }

    /// Replaces a pending stroke with an updated copy (the stroke was
    /// renumbered before it was acknowledged). Returns whether a copy
    /// was pending.
    pub fn replace(&self, stroke: Stroke) -> bool {
        let mut entries = self.inner.entries.lock();
        let mut replaced = false;
        for entry in entries.iter_mut() {
            if entry.id == stroke.id {
                *entry = stroke.clone();
                replaced = true;
            }
        }
        if replaced {
            self.inner.persist(&entries);
        }
        replaced
    }

    /// Returns the number of pending strokes.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Returns a copy of the pending strokes, in enqueue order.
    pub fn pending(&self) -> Vec<Stroke> {
        self.inner.entries.lock().iter().cloned().collect()
    }

    /// Returns how many flushes in a row have failed to deliver.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Fire-and-forget flush of everything currently buffered.
    ///
    /// Triggered after every mutation that produces a new stroke and
    /// whenever the peer becomes reachable again. On failure the buffer
    /// is untouched and the next trigger retries.
    pub fn flush(&self, transport: &Arc<dyn Transport>, round_id: RoundId) {
        QueueInner::flush(&self.inner, transport, round_id, None);
    }

    /// Blocking flush with bounded retry and exponential backoff.
    ///
    /// Returns [`SyncError::TransportUnavailable`] once the attempt
    /// budget is exhausted; the strokes remain queued, so trigger-driven
    /// retry continues afterwards.
    pub fn flush_with_retry(
        &self,
        transport: &Arc<dyn Transport>,
        round_id: RoundId,
        retry: &RetryConfig,
    ) -> SyncResult<()> {
        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                thread::sleep(retry.delay_for_attempt(attempt));
            }
            if self.is_empty() {
                return Ok(());
            }

            let (tx, rx) = mpsc::channel();
            QueueInner::flush(&self.inner, transport, round_id, Some(tx));
            if rx.recv().unwrap_or(false) && self.is_empty() {
                return Ok(());
            }
        }

        if self.is_empty() {
            Ok(())
        } else {
            Err(SyncError::TransportUnavailable {
                attempts: retry.max_attempts,
            })
        }
    }
}
