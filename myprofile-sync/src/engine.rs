//! Sync engine: refreshes the follower store from the remote source.
//!
//! Every write to the store goes through the engine's writer lock, and the
//! resulting snapshot is published before the lock is released. Subscribers
//! therefore see writes in exactly the order they were applied.
//!
//! Each refresh takes a generation number when it starts. A completion whose
//! generation is older than the last committed one is discarded, so a slow
//! refresh can never overwrite the result of a newer one.

use crate::error::SyncResult;
use crate::projection::{Projection, Subscription};
use crate::removal::PendingRemovals;
use crate::source::FollowerSource;
use myprofile_storage::{FollowerStore, StorageResult};
use myprofile_types::FollowerRecord;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long a removed follower can be restored before the removal is
    /// confirmed automatically (ms).
    pub undo_window_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            undo_window_ms: 4_000,
        }
    }
}

impl SyncConfig {
    /// The undo window as a duration.
    pub fn undo_window(&self) -> Duration {
        Duration::from_millis(self.undo_window_ms)
    }
}

/// Result of a refresh that reached the remote successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The remote list replaced the store.
    Applied { generation: u64, count: usize },
    /// A newer refresh committed first; this result was dropped.
    Stale { generation: u64, committed: u64 },
}

impl RefreshOutcome {
    /// Whether the store was replaced.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// State guarded by the writer lock.
pub(crate) struct WriterState {
    /// Generation of the last committed refresh (0 before the first).
    pub(crate) committed: u64,
    pub(crate) pending: PendingRemovals,
}

pub(crate) struct Inner {
    pub(crate) store: Arc<FollowerStore>,
    pub(crate) source: Arc<dyn FollowerSource>,
    pub(crate) config: SyncConfig,
    pub(crate) started: AtomicU64,
    pub(crate) writer: Mutex<WriterState>,
    pub(crate) followers: Projection<Vec<FollowerRecord>>,
}

/// The follower sync engine. Clones share the same store and writer.
#[derive(Clone)]
pub struct FollowerSync {
    pub(crate) inner: Arc<Inner>,
}

impl FollowerSync {
    /// Creates an engine over `store`, seeding subscribers with its current
    /// contents.
    pub async fn open(
        store: Arc<FollowerStore>,
        source: Arc<dyn FollowerSource>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let reader = Arc::clone(&store);
        let initial = tokio::task::spawn_blocking(move || reader.read_all()).await??;
        debug!("Follower store opened with {} records", initial.len());

        Ok(Self {
            inner: Arc::new(Inner {
                store,
                source,
                config,
                started: AtomicU64::new(0),
                writer: Mutex::new(WriterState {
                    committed: 0,
                    pending: PendingRemovals::default(),
                }),
                followers: Projection::new(initial),
            }),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Latest published follower list.
    pub fn followers(&self) -> Vec<FollowerRecord> {
        self.inner.followers.latest()
    }

    /// Attaches an observer of the follower list.
    pub fn subscribe(&self) -> Subscription<Vec<FollowerRecord>> {
        self.inner.followers.subscribe()
    }

    /// Reads the follower list straight from the store.
    pub async fn read_all(&self) -> SyncResult<Vec<FollowerRecord>> {
        self.blocking(|store| store.read_all()).await
    }

    /// Generation of the last committed refresh (0 if none).
    pub async fn committed_generation(&self) -> u64 {
        self.inner.writer.lock().await.committed
    }

    /// Fetches the remote list and installs it in the store.
    ///
    /// On a remote failure the store is untouched and the error is returned;
    /// nothing is retried. A result overtaken by a newer refresh is dropped
    /// and reported as [`RefreshOutcome::Stale`].
    pub async fn refresh(&self) -> SyncResult<RefreshOutcome> {
        let generation = self.inner.started.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Refresh {} started", generation);

        let records = match self.inner.source.fetch_followers().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Refresh {} failed: {}", generation, e);
                return Err(e);
            }
        };

        self.detached(move |sync| async move { sync.commit_refresh(generation, records).await })
            .await
    }

    async fn commit_refresh(
        &self,
        generation: u64,
        records: Vec<FollowerRecord>,
    ) -> SyncResult<RefreshOutcome> {
        let mut state = self.inner.writer.lock().await;
        if generation < state.committed {
            debug!(
                "Refresh {} discarded, generation {} already committed",
                generation, state.committed
            );
            return Ok(RefreshOutcome::Stale {
                generation,
                committed: state.committed,
            });
        }

        let written = self
            .blocking(move |store| store.replace_all(&records))
            .await?;

        state.committed = generation;
        let dropped = state.pending.clear();
        if dropped > 0 {
            debug!("Refresh {} dropped {} pending removals", generation, dropped);
        }
        let count = written.value;
        self.inner.followers.publish(written.followers);
        info!("Refresh {} applied {} followers", generation, count);

        Ok(RefreshOutcome::Applied { generation, count })
    }

    /// Runs `op` on its own task and waits for it.
    ///
    /// Once spawned the task runs to completion even if the caller stops
    /// waiting, so a store write is never separated from the state update
    /// and publish that follow it.
    pub(crate) async fn detached<R, F, Fut>(&self, op: F) -> SyncResult<R>
    where
        F: FnOnce(FollowerSync) -> Fut,
        Fut: Future<Output = SyncResult<R>> + Send + 'static,
        R: Send + 'static,
    {
        tokio::spawn(op(self.clone())).await?
    }

    /// Runs a store operation on the blocking pool.
    pub(crate) async fn blocking<R, F>(&self, f: F) -> SyncResult<R>
    where
        F: FnOnce(&FollowerStore) -> StorageResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.inner.store);
        Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
    }
}
