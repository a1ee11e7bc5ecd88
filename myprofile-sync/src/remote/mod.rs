//! Network-backed follower sources.

pub mod http;

pub use http::{HttpFollowerSource, HttpSourceConfig};
