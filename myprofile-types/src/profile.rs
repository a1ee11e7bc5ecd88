//! The profile card state.

use serde::{Deserialize, Serialize};

/// Profile shown on the profile card.
///
/// `follower_count` and `is_following` only ever change together through
/// [`follow`](Self::follow) and [`unfollow`](Self::unfollow); the count
/// never drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileState {
    pub name: String,
    pub bio: String,
    follower_count: u64,
    is_following: bool,
}

impl Default for ProfileState {
    fn default() -> Self {
        Self {
            name: "Abdurrakhman Tolegen".to_string(),
            bio: "Future Web Developer 💻".to_string(),
            follower_count: 776,
            is_following: false,
        }
    }
}

impl ProfileState {
    /// Creates a profile that the local user does not follow yet.
    pub fn new(name: impl Into<String>, bio: impl Into<String>, follower_count: u64) -> Self {
        Self {
            name: name.into(),
            bio: bio.into(),
            follower_count,
            is_following: false,
        }
    }

    /// Number of followers.
    #[must_use]
    pub fn follower_count(&self) -> u64 {
        self.follower_count
    }

    /// Whether the local user follows this profile.
    #[must_use]
    pub fn is_following(&self) -> bool {
        self.is_following
    }

    /// Starts following. Returns `false` if already following.
    pub fn follow(&mut self) -> bool {
        if self.is_following {
            return false;
        }
        self.is_following = true;
        self.follower_count += 1;
        true
    }

    /// Stops following. Returns `false` if not following.
    pub fn unfollow(&mut self) -> bool {
        if !self.is_following {
            return false;
        }
        self.is_following = false;
        self.follower_count = self.follower_count.saturating_sub(1);
        true
    }

    /// Follows when not following, unfollows otherwise.
    pub fn toggle_follow(&mut self) {
        if self.is_following {
            self.unfollow();
        } else {
            self.follow();
        }
    }

    /// Replaces name and bio together.
    pub fn update(&mut self, name: impl Into<String>, bio: impl Into<String>) {
        self.name = name.into();
        self.bio = bio.into();
    }
}
