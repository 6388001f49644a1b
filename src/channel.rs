use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{ToolCallNotification, ToolResponse};

/// The subscription point between the session client and in-process tool
/// handlers. Incoming notifications fan out to every live subscriber in
/// receipt order; outgoing responses are fire-and-forget toward the
/// session client.
///
/// Cheap to clone — all clones share the same subscriber list and
/// outbound response queue.
#[derive(Clone)]
pub struct ToolCallChannel {
    inner: Arc<Inner>,
}

struct Inner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    outbound: mpsc::UnboundedSender<ToolResponse>,
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<ToolCallNotification>,
}

impl ToolCallChannel {
    /// Create a channel and the receiving end of its response path. The
    /// transport glue drains the receiver and forwards each response
    /// upstream via `sendToolResponse`.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ToolResponse>) {
        let (outbound, responses) = mpsc::unbounded_channel();
        let channel = Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                outbound,
            }),
        };
        (channel, responses)
    }

    /// Register a new subscriber. Every notification delivered while the
    /// subscription is live is sent to it, in delivery order. Dropping
    /// the returned guard (or calling `cancel`) unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_subscribers().push(Subscriber { id, tx });
        debug!(subscription = id, "handler subscribed");
        Subscription {
            id,
            rx,
            inner: self.inner.clone(),
        }
    }

    /// Fan a notification out to every live subscriber. Subscribers whose
    /// receiving end has gone away are pruned here.
    pub fn deliver(&self, notification: &ToolCallNotification) {
        self.lock_subscribers()
            .retain(|s| s.tx.send(notification.clone()).is_ok());
    }

    /// Send a response upstream. Fire-and-forget: if the transport side
    /// has shut down, the response is silently dropped.
    pub fn respond(&self, response: ToolResponse) {
        let _ = self.inner.outbound.send(response);
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        // Lock is only held for list edits; a poisoned lock means another
        // thread panicked mid-edit and the process is already unwinding.
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

/// RAII handle for one delivery stream. At most one stream exists per
/// handle; unsubscription happens exactly once, on drop, no matter how
/// the owning scope exits.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<ToolCallNotification>,
    inner: Arc<Inner>,
}

impl Subscription {
    /// Next notification, in the order the channel delivered them.
    /// Returns `None` once the channel side is gone.
    pub async fn next(&mut self) -> Option<ToolCallNotification> {
        self.rx.recv().await
    }

    /// Explicit unsubscribe. Equivalent to dropping the subscription.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subs = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // Already-pruned entries are fine: removal is a no-op then.
        subs.retain(|s| s.id != self.id);
        debug!(subscription = self.id, "handler unsubscribed");
    }
}
