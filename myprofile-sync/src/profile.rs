//! The profile card: follow/unfollow and profile edits.
//!
//! All operations are local and take effect immediately. When a
//! [`FollowNotifier`] is attached, effective follow changes are forwarded to
//! it in order by a background task; a failed notification is logged and
//! the local state stays as it is.

use crate::projection::{Projection, Subscription};
use crate::source::FollowNotifier;
use myprofile_types::ProfileState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Owner of the session's single [`ProfileState`].
pub struct ProfileSession {
    state: Mutex<ProfileState>,
    projection: Projection<ProfileState>,
    notify_tx: Option<mpsc::UnboundedSender<bool>>,
}

impl Default for ProfileSession {
    fn default() -> Self {
        Self::new(ProfileState::default())
    }
}

impl ProfileSession {
    /// Creates a session around `initial`.
    pub fn new(initial: ProfileState) -> Self {
        Self {
            projection: Projection::new(initial.clone()),
            state: Mutex::new(initial),
            notify_tx: None,
        }
    }

    /// Forwards follow changes to `notifier`.
    ///
    /// The forwarding task is spawned on the current tokio runtime; without
    /// one, notifications stay disabled.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn FollowNotifier>) -> Self {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime, follow notifications disabled");
            return self;
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<bool>();
        handle.spawn(async move {
            while let Some(following) = rx.recv().await {
                if let Err(e) = notifier.notify_follow(following).await {
                    warn!("Follow notification ({}) failed: {}", following, e);
                }
            }
            debug!("Follow notification task stopped");
        });
        self.notify_tx = Some(tx);
        self
    }

    // The state is only ever replaced wholesale under this lock.
    fn lock(&self) -> MutexGuard<'_, ProfileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current profile.
    pub fn profile(&self) -> ProfileState {
        self.lock().clone()
    }

    /// Attaches an observer of the profile.
    pub fn subscribe(&self) -> Subscription<ProfileState> {
        self.projection.subscribe()
    }

    /// Follows the profile. Returns `false` if already following.
    pub fn follow(&self) -> bool {
        self.mutate_follow(ProfileState::follow)
    }

    /// Unfollows the profile. Returns `false` if not following.
    pub fn unfollow(&self) -> bool {
        self.mutate_follow(ProfileState::unfollow)
    }

    /// Follows or unfollows depending on the current state. Returns the new
    /// following flag.
    pub fn toggle_follow(&self) -> bool {
        let mut state = self.lock();
        state.toggle_follow();
        let following = state.is_following();
        self.projection.publish(state.clone());
        self.notify(following);
        following
    }

    /// Replaces name and bio together.
    pub fn update_profile(&self, name: impl Into<String>, bio: impl Into<String>) {
        let mut state = self.lock();
        state.update(name, bio);
        self.projection.publish(state.clone());
    }

    fn mutate_follow(&self, op: fn(&mut ProfileState) -> bool) -> bool {
        let mut state = self.lock();
        if !op(&mut *state) {
            return false;
        }
        self.projection.publish(state.clone());
        self.notify(state.is_following());
        true
    }

    fn notify(&self, following: bool) {
        if let Some(tx) = &self.notify_tx {
            if tx.send(following).is_err() {
                debug!("Follow notification task gone, dropping notification");
            }
        }
    }
}
