//! In-memory paired transport.
//!
//! [`LinkTransport::pair`] builds two connected endpoints that deliver
//! through the real wire codec (encode on send, decode at the peer), so
//! two full replicas can be exercised in-process exactly as they would
//! talk over a device channel.

use crate::transport::{MessageHandler, ReachabilityHandler, SendCompletion, Transport};
use parking_lot::RwLock;
use roundlink_protocol::{decode_message, encode_message, SyncMessage};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// One endpoint of an in-memory two-peer channel.
///
/// Reachability is shared by both endpoints (the channel is either up
/// or down); `set_reachable` fires the reachability handlers on both
/// sides, which is the trigger for opportunistic flushing. Individual
/// deliveries can additionally be dropped with
/// [`inject_failures`](Self::inject_failures).
pub struct LinkTransport {
    peer: RwLock<Weak<LinkTransport>>,
    reachable: Arc<AtomicBool>,
    drop_next: AtomicU32,
    handler: RwLock<Option<MessageHandler>>,
    reachability_handler: RwLock<Option<ReachabilityHandler>>,
}

impl LinkTransport {
    /// Creates two connected endpoints.
    #[must_use]
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let reachable = Arc::new(AtomicBool::new(true));
        let a = Arc::new(Self::new(Arc::clone(&reachable)));
        let b = Arc::new(Self::new(reachable));
        *a.peer.write() = Arc::downgrade(&b);
        *b.peer.write() = Arc::downgrade(&a);
        (a, b)
    }

    fn new(reachable: Arc<AtomicBool>) -> Self {
        Self {
            peer: RwLock::new(Weak::new()),
            reachable,
            drop_next: AtomicU32::new(0),
            handler: RwLock::new(None),
            reachability_handler: RwLock::new(None),
        }
    }

    /// Brings the channel up or down, firing reachability handlers on
    /// both endpoints when the state transitions.
    pub fn set_reachable(&self, reachable: bool) {
        let previous = self.reachable.swap(reachable, Ordering::SeqCst);
        if previous == reachable {
            return;
        }
        debug!(reachable, "link reachability changed");
        self.fire_reachability(reachable);
        if let Some(peer) = self.peer.read().upgrade() {
            peer.fire_reachability(reachable);
        }
    }

    /// Drops the next `n` deliveries from this endpoint.
    pub fn inject_failures(&self, n: u32) {
        self.drop_next.store(n, Ordering::SeqCst);
    }

    fn fire_reachability(&self, reachable: bool) {
        let handler = self.reachability_handler.read().clone();
        if let Some(handler) = handler {
            handler(reachable);
        }
    }

    fn deliver(&self, message: SyncMessage) -> bool {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => handler(message),
            None => false,
        }
    }
}

impl Transport for LinkTransport {
    fn send(&self, message: SyncMessage, on_complete: SendCompletion) {
        let dropped = self
            .drop_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            debug!(kind = message.kind(), "link dropped message (injected failure)");
            on_complete(false);
            return;
        }

        if !self.is_reachable() {
            on_complete(false);
            return;
        }

        let Some(peer) = self.peer.read().upgrade() else {
            on_complete(false);
            return;
        };

        // Through the real codec, as a device channel would carry it.
        let delivered = match encode_message(&message) {
            Ok(bytes) => match decode_message(&bytes) {
                Ok(decoded) => peer.deliver(decoded),
                Err(_) => false,
            },
            Err(_) => false,
        };
        on_complete(delivered);
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
