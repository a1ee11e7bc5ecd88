//! Replay-last publish/subscribe.
//!
//! A [`Projection`] holds the latest value of some piece of state and fans
//! every new value out to its subscribers. A new subscriber first receives
//! the latest value, then every later one in publish order.
//!
//! Each subscriber owns an unbounded queue, so a slow subscriber never makes
//! another one miss a value and never blocks the publisher. Dropping (or
//! [`detach`](Subscription::detach)ing) the subscription removes its queue.

use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

struct Shared<T> {
    latest: T,
    version: u64,
    next_id: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<T>>,
}

// Every critical section below leaves `Shared` consistent, so a poisoned
// lock still guards valid data.
fn lock<T>(shared: &Mutex<Shared<T>>) -> MutexGuard<'_, Shared<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Latest value plus its live subscribers. Clones share the same state.
pub struct Projection<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Projection<T> {
    /// Creates a projection whose latest value is `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                latest: initial,
                version: 0,
                next_id: 0,
                subscribers: HashMap::new(),
            })),
        }
    }

    /// Replaces the latest value and delivers it to every subscriber.
    /// Returns how many subscribers received it.
    pub fn publish(&self, value: T) -> usize {
        let mut shared = lock(&self.shared);
        shared.version += 1;
        // Receivers that went away without running Drop (e.g. leaked) are
        // pruned here.
        shared
            .subscribers
            .retain(|_, tx| tx.send(value.clone()).is_ok());
        shared.latest = value;
        shared.subscribers.len()
    }

    /// Returns a copy of the latest value.
    pub fn latest(&self) -> T {
        lock(&self.shared).latest.clone()
    }

    /// Number of values published since creation.
    pub fn version(&self) -> u64 {
        lock(&self.shared).version
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared).subscribers.len()
    }

    /// Attaches a subscriber. Its first value is the current latest value.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut shared = lock(&self.shared);
        let id = shared.next_id;
        shared.next_id += 1;
        // Cannot fail: `rx` is alive.
        let _ = tx.send(shared.latest.clone());
        shared.subscribers.insert(id, tx);

        Subscription {
            id,
            rx,
            shared: Arc::downgrade(&self.shared),
        }
    }
}

/// Handle of one attached subscriber.
///
/// Ends (yields `None`) once every [`Projection`] clone is dropped and the
/// queued values are drained.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::UnboundedReceiver<T>,
    shared: Weak<Mutex<Shared<T>>>,
}

impl<T> Subscription<T> {
    /// Waits for the next value.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Takes the next value if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drains queued values and returns the newest one, if any.
    pub fn try_latest(&mut self) -> Option<T> {
        let mut newest = None;
        while let Ok(value) = self.rx.try_recv() {
            newest = Some(value);
        }
        newest
    }

    /// Detaches from the projection, releasing the queue.
    pub fn detach(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared).subscribers.remove(&self.id);
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
