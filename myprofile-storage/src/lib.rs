//! SQLite storage layer for the MyProfile follower-sync core.
//!
//! Holds the last known follower list in a single table keyed by follower
//! id, with an explicit `position` column carrying display order.
//!
//! # Architecture
//!
//! - Bulk replacement runs in one transaction, so readers see either the
//!   old list or the new one
//! - Single-row operations (remove, restore, append, follow flag) back the
//!   optimistic mutations of the sync layer
//! - Every write returns the list it left behind, read in the same
//!   transaction ([`Written`])
//! - The schema is versioned with `PRAGMA user_version`; a database written
//!   with another version is recreated empty on open

mod error;
mod follower_store;

pub use error::{StorageError, StorageResult};
pub use follower_store::{FollowerStore, Written, SCHEMA_VERSION};
