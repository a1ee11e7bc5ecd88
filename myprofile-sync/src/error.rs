//! Error types for the sync layer.

use myprofile_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// A refresh that lost the race against a newer one is not an error; see
/// [`RefreshOutcome::Stale`](crate::RefreshOutcome::Stale).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote fetch failed. The store was left untouched.
    #[error("transport error: {0}")]
    Transport(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),

    /// The remote did not answer in time. The store was left untouched.
    #[error("operation timed out")]
    Timeout,
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

impl SyncError {
    /// Whether this is a remote failure the caller may retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}
