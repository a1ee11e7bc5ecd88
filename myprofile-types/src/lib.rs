//! Core type definitions for the MyProfile follower-sync core.
//!
//! This crate defines the plain data types shared by storage and sync:
//! - Follower identifiers and removal tokens
//! - [`FollowerRecord`], one row of the follower list
//! - [`ProfileState`], the single profile card of a session
//! - [`PendingRemoval`], a follower removed but still undoable
//!
//! Nothing here performs I/O or holds locks.

mod follower;
mod ids;
mod profile;

pub use follower::{FollowerRecord, PendingRemoval};
pub use ids::{FollowerId, RemovalToken};
pub use profile::ProfileState;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid follower id: {0:?}")]
    InvalidId(String),
}
