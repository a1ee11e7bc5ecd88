//! Optimistic follower mutations.
//!
//! A removed follower leaves the store at once and sits in the pending set
//! until it is undone, confirmed, or its undo window runs out:
//!
//! ```text
//! Visible --remove--> Pending --undo-----------> Visible
//!                             --confirm/expiry--> Discarded
//! ```
//!
//! A record is never both stored and pending. Each removal carries its own
//! [`RemovalToken`]; the expiry timer only resolves the removal it was armed
//! for, and resolving a removal explicitly aborts its timer.

use crate::engine::FollowerSync;
use crate::error::SyncResult;
use myprofile_types::{FollowerId, FollowerRecord, PendingRemoval, RemovalToken};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Result of a local follower mutation. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The mutation was applied.
    Applied,
    /// The follower was removed; the removal can be undone with this token
    /// until it expires.
    Pending(RemovalToken),
    /// A removal for this follower is already open; nothing changed.
    AlreadyPending,
    /// A follower with this id is already stored; nothing changed.
    AlreadyExists,
    /// No such follower (or no open removal); nothing changed.
    NotFound,
}

struct PendingEntry {
    removal: PendingRemoval,
    timer: Option<AbortHandle>,
}

/// Open removals keyed by follower id.
#[derive(Default)]
pub(crate) struct PendingRemovals {
    entries: HashMap<FollowerId, PendingEntry>,
}

impl PendingRemovals {
    pub(crate) fn contains(&self, id: &FollowerId) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn get(&self, id: &FollowerId) -> Option<&PendingRemoval> {
        self.entries.get(id).map(|e| &e.removal)
    }

    fn open(&mut self, removal: PendingRemoval, timer: Option<AbortHandle>) {
        let id = removal.id().clone();
        if let Some(old) = self.entries.insert(id, PendingEntry { removal, timer }) {
            if let Some(timer) = old.timer {
                timer.abort();
            }
        }
    }

    /// Resolves the removal of `id`, aborting its timer.
    pub(crate) fn take(&mut self, id: &FollowerId) -> Option<PendingRemoval> {
        let entry = self.entries.remove(id)?;
        if let Some(timer) = entry.timer {
            timer.abort();
        }
        Some(entry.removal)
    }

    /// Resolves the removal of `id` only if it is the one `token` names.
    /// Called from the timer itself, so the timer is not aborted.
    fn take_expired(&mut self, id: &FollowerId, token: RemovalToken) -> Option<PendingRemoval> {
        if self.entries.get(id)?.removal.token != token {
            return None;
        }
        self.entries.remove(id).map(|e| e.removal)
    }

    /// Drops every open removal. Returns how many were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
        }
        count
    }

    /// Open removals ordered by their former position.
    pub(crate) fn list(&self) -> Vec<PendingRemoval> {
        let mut list: Vec<_> = self.entries.values().map(|e| e.removal.clone()).collect();
        list.sort_by_key(|r| r.position);
        list
    }
}

impl FollowerSync {
    /// Takes a follower out of the list and opens an undo window for it.
    pub async fn remove(&self, id: &FollowerId) -> SyncResult<MutationOutcome> {
        let id = id.clone();
        self.detached(move |sync| async move { sync.remove_now(id).await })
            .await
    }

    /// Puts a pending follower back at its former position.
    pub async fn undo(&self, id: &FollowerId) -> SyncResult<MutationOutcome> {
        let id = id.clone();
        self.detached(move |sync| async move { sync.undo_now(id).await })
            .await
    }

    /// Makes a pending removal permanent. A later `undo` is a no-op.
    pub async fn confirm(&self, id: &FollowerId) -> SyncResult<MutationOutcome> {
        let mut state = self.inner.writer.lock().await;
        match state.pending.take(id) {
            Some(_) => {
                info!("Follower {} removal confirmed", id);
                Ok(MutationOutcome::Applied)
            }
            None => Ok(MutationOutcome::NotFound),
        }
    }

    /// Open removals, ordered by their former position.
    pub async fn pending_removals(&self) -> Vec<PendingRemoval> {
        self.inner.writer.lock().await.pending.list()
    }

    /// Sets whether the local user follows `id` back.
    pub async fn set_follower_following(
        &self,
        id: &FollowerId,
        following: bool,
    ) -> SyncResult<MutationOutcome> {
        let id = id.clone();
        self.detached(move |sync| async move {
            let _state = sync.inner.writer.lock().await;
            let written = sync
                .blocking(move |store| store.set_following(&id, following))
                .await?;
            if !written.value {
                return Ok(MutationOutcome::NotFound);
            }
            sync.inner.followers.publish(written.followers);
            Ok(MutationOutcome::Applied)
        })
        .await
    }

    /// Flips whether the local user follows `id` back.
    pub async fn toggle_follower(&self, id: &FollowerId) -> SyncResult<MutationOutcome> {
        let id = id.clone();
        self.detached(move |sync| async move {
            let _state = sync.inner.writer.lock().await;
            let written = sync
                .blocking(move |store| store.toggle_following(&id))
                .await?;
            if written.value.is_none() {
                return Ok(MutationOutcome::NotFound);
            }
            sync.inner.followers.publish(written.followers);
            Ok(MutationOutcome::Applied)
        })
        .await
    }

    /// Adds a follower locally, after all existing ones.
    ///
    /// A record with a blank id is refused with a storage error and nothing
    /// changes.
    pub async fn add_follower(&self, record: FollowerRecord) -> SyncResult<MutationOutcome> {
        self.detached(move |sync| async move {
            let state = sync.inner.writer.lock().await;
            if state.pending.contains(&record.id) {
                return Ok(MutationOutcome::AlreadyPending);
            }

            let written = sync.blocking(move |store| store.append(&record)).await?;
            if !written.value {
                return Ok(MutationOutcome::AlreadyExists);
            }
            sync.inner.followers.publish(written.followers);
            Ok(MutationOutcome::Applied)
        })
        .await
    }

    async fn remove_now(&self, id: FollowerId) -> SyncResult<MutationOutcome> {
        let mut state = self.inner.writer.lock().await;
        if state.pending.contains(&id) {
            debug!("Follower {} already pending removal", id);
            return Ok(MutationOutcome::AlreadyPending);
        }

        let target = id.clone();
        let written = self.blocking(move |store| store.remove(&target)).await?;
        let Some((position, record)) = written.value else {
            return Ok(MutationOutcome::NotFound);
        };

        let removal = PendingRemoval::new(record, position);
        let token = removal.token;
        let timer = self.arm_expiry(id.clone(), token);
        state.pending.open(removal, Some(timer));
        self.inner.followers.publish(written.followers);
        info!("Follower {} removed, undo window open", id);

        Ok(MutationOutcome::Pending(token))
    }

    async fn undo_now(&self, id: FollowerId) -> SyncResult<MutationOutcome> {
        let mut state = self.inner.writer.lock().await;
        let Some(removal) = state.pending.get(&id).cloned() else {
            debug!("Undo for {} ignored, no pending removal", id);
            return Ok(MutationOutcome::NotFound);
        };

        let written = self
            .blocking(move |store| store.restore(removal.position, &removal.record))
            .await?;

        state.pending.take(&id);
        if !written.value {
            warn!("Follower {} reappeared while pending removal", id);
            return Ok(MutationOutcome::AlreadyExists);
        }
        self.inner.followers.publish(written.followers);
        info!("Follower {} restored", id);

        Ok(MutationOutcome::Applied)
    }

    fn arm_expiry(&self, id: FollowerId, token: RemovalToken) -> AbortHandle {
        let window = self.inner.config.undo_window();
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inner) = weak.upgrade() {
                FollowerSync { inner }.expire(&id, token).await;
            }
        });
        task.abort_handle()
    }

    async fn expire(&self, id: &FollowerId, token: RemovalToken) {
        let mut state = self.inner.writer.lock().await;
        if state.pending.take_expired(id, token).is_some() {
            info!("Follower {} removal confirmed after undo window", id);
        }
    }
}
