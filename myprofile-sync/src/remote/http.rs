//! JSON-over-HTTP follower source.
//!
//! `GET {base_url}/{followers_path}` returns the follower list as a JSON
//! array; `POST {base_url}/{follow_path}` receives follow notifications.

use crate::error::{SyncError, SyncResult};
use crate::source::{FollowNotifier, FollowerSource};
use async_trait::async_trait;
use myprofile_types::FollowerRecord;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for [`HttpFollowerSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSourceConfig {
    /// Base URL of the API, without a trailing slash.
    pub base_url: String,
    /// Path of the follower list endpoint.
    pub followers_path: String,
    /// Path of the follow notification endpoint.
    pub follow_path: String,
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jsonplaceholder.typicode.com".to_string(),
            followers_path: "users".to_string(),
            follow_path: "follows".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl HttpSourceConfig {
    /// Config pointing at `base_url` with default paths.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Full URL of the follower list endpoint.
    pub fn followers_url(&self) -> String {
        self.url(&self.followers_path)
    }

    /// Full URL of the follow notification endpoint.
    pub fn follow_url(&self) -> String {
        self.url(&self.follow_path)
    }
}

#[derive(Debug, Serialize)]
struct FollowNotification {
    following: bool,
}

/// Follower source talking to a JSON HTTP API.
pub struct HttpFollowerSource {
    config: HttpSourceConfig,
    client: Client,
}

impl HttpFollowerSource {
    /// Creates a source for the given config.
    pub fn new(config: HttpSourceConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Returns the config.
    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }
}

fn request_error(action: &str, e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Timeout
    } else {
        SyncError::Transport(format!("{action} failed: {e}"))
    }
}

#[async_trait]
impl FollowerSource for HttpFollowerSource {
    async fn fetch_followers(&self) -> SyncResult<Vec<FollowerRecord>> {
        let url = self.config.followers_url();
        debug!("Fetching followers from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error("follower fetch", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Transport(format!(
                "follower fetch failed: {status}: {body}"
            )));
        }

        response
            .json::<Vec<FollowerRecord>>()
            .await
            .map_err(|e| SyncError::Transport(format!("failed to parse follower list: {e}")))
    }
}

#[async_trait]
impl FollowNotifier for HttpFollowerSource {
    async fn notify_follow(&self, following: bool) -> SyncResult<()> {
        let response = self
            .client
            .post(self.config.follow_url())
            .json(&FollowNotification { following })
            .send()
            .await
            .map_err(|e| request_error("follow notification", e))?;

        if !response.status().is_success() {
            return Err(SyncError::Transport(format!(
                "follow notification failed: {}",
                response.status()
            )));
        }
        Ok(())
    }
}
