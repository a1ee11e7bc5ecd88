//! The entry points the presentation layer is allowed to call.

use crate::engine::{FollowerSync, RefreshOutcome, SyncConfig};
use crate::error::SyncResult;
use crate::profile::ProfileSession;
use crate::projection::Subscription;
use crate::removal::MutationOutcome;
use crate::source::FollowerSource;
use myprofile_storage::FollowerStore;
use myprofile_types::{FollowerId, FollowerRecord, PendingRemoval, ProfileState};
use std::sync::Arc;

/// One user session: the follower list and the profile card.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Session {
    followers: FollowerSync,
    profile: Arc<ProfileSession>,
}

impl Session {
    /// Creates a session from its parts.
    pub fn new(followers: FollowerSync, profile: ProfileSession) -> Self {
        Self {
            followers,
            profile: Arc::new(profile),
        }
    }

    /// Opens a session over `store` with the default profile.
    pub async fn open(
        store: Arc<FollowerStore>,
        source: Arc<dyn FollowerSource>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let followers = FollowerSync::open(store, source, config).await?;
        Ok(Self::new(followers, ProfileSession::default()))
    }

    /// The follower engine.
    pub fn sync(&self) -> &FollowerSync {
        &self.followers
    }

    // ── Observation ──────────────────────────────────────────────

    /// Live follower list, starting with the current one.
    pub fn observe_followers(&self) -> Subscription<Vec<FollowerRecord>> {
        self.followers.subscribe()
    }

    /// Live profile, starting with the current one.
    pub fn observe_profile(&self) -> Subscription<ProfileState> {
        self.profile.subscribe()
    }

    /// Latest follower list.
    pub fn followers(&self) -> Vec<FollowerRecord> {
        self.followers.followers()
    }

    /// Current profile.
    pub fn profile(&self) -> ProfileState {
        self.profile.profile()
    }

    // ── Profile ──────────────────────────────────────────────────

    /// Follows the profile. Returns `false` if already following.
    pub fn follow(&self) -> bool {
        self.profile.follow()
    }

    /// Unfollows the profile. Returns `false` if not following.
    pub fn unfollow(&self) -> bool {
        self.profile.unfollow()
    }

    /// Follows or unfollows; returns the new following flag.
    pub fn toggle_follow(&self) -> bool {
        self.profile.toggle_follow()
    }

    /// Replaces name and bio together.
    pub fn update_profile(&self, name: impl Into<String>, bio: impl Into<String>) {
        self.profile.update_profile(name, bio);
    }

    // ── Followers ────────────────────────────────────────────────

    /// Refreshes the follower list from the remote.
    pub async fn refresh(&self) -> SyncResult<RefreshOutcome> {
        self.followers.refresh().await
    }

    /// Removes a follower and opens its undo window.
    pub async fn remove(&self, id: &FollowerId) -> SyncResult<MutationOutcome> {
        self.followers.remove(id).await
    }

    /// Restores a pending follower at its former position.
    pub async fn undo(&self, id: &FollowerId) -> SyncResult<MutationOutcome> {
        self.followers.undo(id).await
    }

    /// Makes a pending removal permanent.
    pub async fn confirm(&self, id: &FollowerId) -> SyncResult<MutationOutcome> {
        self.followers.confirm(id).await
    }

    /// Removals that can still be undone.
    pub async fn pending_removals(&self) -> Vec<PendingRemoval> {
        self.followers.pending_removals().await
    }

    /// Flips the follow-back flag of a follower.
    pub async fn toggle_follower(&self, id: &FollowerId) -> SyncResult<MutationOutcome> {
        self.followers.toggle_follower(id).await
    }

    /// Sets the follow-back flag of a follower.
    pub async fn set_follower_following(
        &self,
        id: &FollowerId,
        following: bool,
    ) -> SyncResult<MutationOutcome> {
        self.followers.set_follower_following(id, following).await
    }

    /// Adds a follower locally, after all existing ones.
    pub async fn add_follower(&self, record: FollowerRecord) -> SyncResult<MutationOutcome> {
        self.followers.add_follower(record).await
    }
}
