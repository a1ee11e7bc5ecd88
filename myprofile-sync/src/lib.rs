//! Follower sync core for MyProfile.
//!
//! Keeps a local follower store consistent with a remote source while the
//! UI applies optimistic changes on top of it.
//!
//! # Components
//!
//! - **Source**: the remote follower list ([`FollowerSource`]), with an HTTP
//!   implementation in [`remote`]
//! - **Engine**: refreshes the store and serializes every store write
//!   ([`FollowerSync`])
//! - **Projection**: replay-last fan-out of the latest snapshot to any
//!   number of observers ([`Projection`])
//! - **Removal**: remove-with-undo and other local follower mutations
//! - **Profile**: follow/unfollow and profile edits ([`ProfileSession`])
//! - **Session**: the facade the presentation layer talks to ([`Session`])
//!
//! # Refresh
//!
//! 1. The refresh takes the next generation number
//! 2. The source is queried; a failure is returned and the store is untouched
//! 3. Under the writer lock, a result older than the last committed
//!    generation is dropped
//! 4. Otherwise the store is replaced, open removals are dropped and the new
//!    snapshot is published
//!
//! # Example
//!
//! ```no_run
//! use myprofile_storage::FollowerStore;
//! use myprofile_sync::{HttpFollowerSource, HttpSourceConfig, Session, SyncConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> myprofile_sync::SyncResult<()> {
//! let store = Arc::new(FollowerStore::open("followers.db")?);
//! let source = Arc::new(HttpFollowerSource::new(HttpSourceConfig::default())?);
//! let session = Session::open(store, source, SyncConfig::default()).await?;
//!
//! let mut followers = session.observe_followers();
//! session.refresh().await?;
//! let latest = followers.try_latest();
//! # let _ = latest;
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
pub mod profile;
pub mod projection;
pub mod remote;
mod removal;
mod session;
pub mod source;

pub use engine::{FollowerSync, RefreshOutcome, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use profile::ProfileSession;
pub use projection::{Projection, Subscription};
pub use remote::{HttpFollowerSource, HttpSourceConfig};
pub use removal::MutationOutcome;
pub use session::Session;
pub use source::{FollowNotifier, FollowerSource};
