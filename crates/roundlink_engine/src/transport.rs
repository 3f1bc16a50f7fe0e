//! Transport layer abstraction.
//!
//! Models an unreliable, possibly-unreachable channel between exactly
//! two peers. Delivery is not guaranteed, completions may run on any
//! thread, no ordering is assumed between sends, and retry is the
//! caller's responsibility (the pending queue's, for strokes).

use parking_lot::{Mutex, RwLock};
use roundlink_protocol::SyncMessage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Completion callback for one send: `true` means the peer received and
/// applied the message.
pub type SendCompletion = Box<dyn FnOnce(bool) + Send>;

/// Handler for inbound messages. The returned bool is the delivery
/// acknowledgment reported to the sender's completion.
pub type MessageHandler = Arc<dyn Fn(SyncMessage) -> bool + Send + Sync>;

/// Handler for peer reachability transitions.
pub type ReachabilityHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// An unreliable channel to the other replica.
///
/// Implementations must invoke `on_complete` exactly once per send,
/// possibly on another thread and possibly reporting failure (peer
/// unreachable) without any retry of their own.
pub trait Transport: Send + Sync {
    /// Attempts to deliver one message to the peer.
    fn send(&self, message: SyncMessage, on_complete: SendCompletion);

    /// Returns whether the peer currently looks reachable.
    fn is_reachable(&self) -> bool;

    /// Installs the handler invoked for each inbound message.
    fn set_message_handler(&self, handler: MessageHandler);

    /// Installs the handler invoked on reachability transitions.
    fn set_reachability_handler(&self, handler: ReachabilityHandler);
}

/// A scripted transport for unit tests.
///
/// Records every send attempt, can fail the next N sends, can defer
/// completions so a test controls exactly when delivery is
/// acknowledged, and delivers inbound messages on demand.
#[derive(Default)]
pub struct MockTransport {
    reachable: AtomicBool,
    fail_next: AtomicU32,
    defer_completions: AtomicBool,
    sent: Mutex<Vec<SyncMessage>>,
    deferred: Mutex<VecDeque<SendCompletion>>,
    handler: RwLock<Option<MessageHandler>>,
    reachability_handler: RwLock<Option<ReachabilityHandler>>,
}

impl MockTransport {
    /// Creates a reachable mock transport.
    #[must_use]
    pub fn new() -> Arc<Self> {
        let transport = Self::default();
        transport.reachable.store(true, Ordering::SeqCst);
        Arc::new(transport)
    }

    /// Fails the next `n` sends.
    pub fn fail_next_sends(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Defers completions; the test releases them with
    /// [`complete_next`](Self::complete_next).
    pub fn defer_completions(&self, defer: bool) {
        self.defer_completions.store(defer, Ordering::SeqCst);
    }

    /// Completes the oldest deferred send. Returns `false` if none was
    /// pending.
    pub fn complete_next(&self, success: bool) -> bool {
        let completion = self.deferred.lock().pop_front();
        match completion {
            Some(completion) => {
                completion(success);
                true
            }
            None => false,
        }
    }

    /// Sets reachability and fires the reachability handler on change.
    pub fn set_reachable(&self, reachable: bool) {
        let previous = self.reachable.swap(reachable, Ordering::SeqCst);
        if previous != reachable {
            let handler = self.reachability_handler.read().clone();
            if let Some(handler) = handler {
                handler(reachable);
            }
        }
    }

    /// Returns every message passed to [`Transport::send`] so far.
    pub fn sent(&self) -> Vec<SyncMessage> {
        self.sent.lock().clone()
    }

    /// Delivers an inbound message to the installed handler.
    ///
    /// Returns the handler's acknowledgment, or `false` if no handler
    /// is installed.
    pub fn deliver(&self, message: SyncMessage) -> bool {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => handler(message),
            None => false,
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, message: SyncMessage, on_complete: SendCompletion) {
        self.sent.lock().push(message);

        if self.defer_completions.load(Ordering::SeqCst) {
            self.deferred.lock().push_back(on_complete);
            return;
        }

        let scripted_failure = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if scripted_failure || !self.is_reachable() {
            on_complete(false);
        } else {
            on_complete(true);
        }
    }

    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    fn set_message_handler(&self, handler: MessageHandler) {
        *self.handler.write() = Some(handler);
    }

    fn set_reachability_handler(&self, handler: ReachabilityHandler) {
        *self.reachability_handler.write() = Some(handler);
    }
}
