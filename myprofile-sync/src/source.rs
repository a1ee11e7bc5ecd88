//! Remote source abstraction.
//!
//! The sync engine only needs one call from the remote: the authoritative
//! follower list. Follow notifications are a separate, optional trait so a
//! read-only source doesn't have to implement them.

use crate::error::SyncResult;
use async_trait::async_trait;
use myprofile_types::FollowerRecord;

/// Supplies the authoritative follower list.
#[async_trait]
pub trait FollowerSource: Send + Sync {
    /// Fetches the full follower list. Failures are reported as
    /// [`SyncError::Transport`](crate::SyncError::Transport) or
    /// [`SyncError::Timeout`](crate::SyncError::Timeout).
    async fn fetch_followers(&self) -> SyncResult<Vec<FollowerRecord>>;
}

/// Receives best-effort follow/unfollow notifications for the profile.
#[async_trait]
pub trait FollowNotifier: Send + Sync {
    /// Tells the remote that the local user now follows (`true`) or no
    /// longer follows (`false`) the profile.
    async fn notify_follow(&self, following: bool) -> SyncResult<()>;
}

/// A scriptable source for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::{oneshot, Notify};

    type Reply = Result<Vec<FollowerRecord>, String>;

    enum Scripted {
        Ready(Reply),
        Gated(oneshot::Receiver<Reply>),
    }

    /// Releases one gated fetch.
    #[derive(Debug)]
    pub struct MockGate {
        tx: oneshot::Sender<Reply>,
    }

    impl MockGate {
        /// Completes the gated fetch with `records`.
        pub fn succeed(self, records: Vec<FollowerRecord>) {
            let _ = self.tx.send(Ok(records));
        }

        /// Completes the gated fetch with a transport failure.
        pub fn fail(self, reason: impl Into<String>) {
            let _ = self.tx.send(Err(reason.into()));
        }
    }

    /// Source returning scripted replies in call order, then a default list.
    #[derive(Default)]
    pub struct MockSource {
        scripted: Mutex<VecDeque<Scripted>>,
        default: Mutex<Vec<FollowerRecord>>,
        calls: AtomicUsize,
        called: Notify,
        notifications: Mutex<Vec<bool>>,
        fail_notify: AtomicBool,
    }

    impl MockSource {
        /// Creates a source whose default reply is an empty list.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a source whose default reply is `records`.
        pub fn with_followers(records: Vec<FollowerRecord>) -> Self {
            let source = Self::default();
            source.set_followers(records);
            source
        }

        /// Replaces the default reply.
        pub fn set_followers(&self, records: Vec<FollowerRecord>) {
            *self.default.lock().unwrap() = records;
        }

        /// Queues a one-off successful reply.
        pub fn push_ok(&self, records: Vec<FollowerRecord>) {
            self.push(Scripted::Ready(Ok(records)));
        }

        /// Queues a one-off transport failure.
        pub fn push_err(&self, reason: impl Into<String>) {
            self.push(Scripted::Ready(Err(reason.into())));
        }

        /// Queues a reply that only completes when the returned gate is
        /// released. Dropping the gate fails the fetch.
        pub fn push_gated(&self) -> MockGate {
            let (tx, rx) = oneshot::channel();
            self.push(Scripted::Gated(rx));
            MockGate { tx }
        }

        fn push(&self, scripted: Scripted) {
            self.scripted.lock().unwrap().push_back(scripted);
        }

        /// Number of fetches started so far.
        pub fn fetch_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Waits until at least `n` fetches have started.
        pub async fn wait_for_fetches(&self, n: usize) {
            loop {
                let notified = self.called.notified();
                if self.fetch_count() >= n {
                    return;
                }
                notified.await;
            }
        }

        /// Follow notifications received so far, oldest first.
        pub fn notifications(&self) -> Vec<bool> {
            self.notifications.lock().unwrap().clone()
        }

        /// Makes later follow notifications fail (after recording them).
        pub fn fail_notifications(&self, fail: bool) {
            self.fail_notify.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl FollowerSource for MockSource {
        async fn fetch_followers(&self) -> SyncResult<Vec<FollowerRecord>> {
            let next = self.scripted.lock().unwrap().pop_front();
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.called.notify_waiters();

            let reply = match next {
                Some(Scripted::Ready(reply)) => reply,
                Some(Scripted::Gated(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err("gate dropped".to_string())),
                None => Ok(self.default.lock().unwrap().clone()),
            };
            reply.map_err(SyncError::Transport)
        }
    }

    #[async_trait]
    impl FollowNotifier for MockSource {
        async fn notify_follow(&self, following: bool) -> SyncResult<()> {
            self.notifications.lock().unwrap().push(following);
            if self.fail_notify.load(Ordering::SeqCst) {
                return Err(SyncError::Transport("notification rejected".into()));
            }
            Ok(())
        }
    }
}
