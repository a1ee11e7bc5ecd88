//! Follower rows and pending removals.

use crate::{FollowerId, RemovalToken};
use serde::{Deserialize, Serialize};

/// One follower as shown in the follower list.
///
/// Identity is `id`; two records with the same id describe the same
/// follower even when their other fields differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowerRecord {
    pub id: FollowerId,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the local user follows this follower back.
    #[serde(default)]
    pub following_state: bool,
}

impl FollowerRecord {
    /// Creates a record that is not followed back and has no email.
    pub fn new(id: impl Into<FollowerId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: None,
            following_state: false,
        }
    }

    /// Creates a record for a follower added locally, with a fresh id.
    pub fn local(display_name: impl Into<String>) -> Self {
        Self::new(FollowerId::new(), display_name)
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the following flag.
    #[must_use]
    pub fn with_following(mut self, following: bool) -> Self {
        self.following_state = following;
        self
    }

    /// Parses a JSON array of records (remote payload format).
    pub fn list_from_json(json: &str) -> crate::Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A follower taken out of the visible list whose removal can still be
/// undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRemoval {
    /// The record as it was when removed.
    pub record: FollowerRecord,
    /// Ordering slot the record occupied in the store.
    pub position: i64,
    /// Token of this particular removal.
    pub token: RemovalToken,
}

impl PendingRemoval {
    /// Opens a removal with a fresh token.
    pub fn new(record: FollowerRecord, position: i64) -> Self {
        Self {
            record,
            position,
            token: RemovalToken::new(),
        }
    }

    /// Id of the removed follower.
    pub fn id(&self) -> &FollowerId {
        &self.record.id
    }
}
