//! Remote directory access
//!
//! The remote directory is the authoritative store of a user's entries,
//! keyed by URL with no defined order. This crate only consumes it through
//! the five calls of [`RemoteDirectory`].
//!
//! ## Implementations
//!
//! - [`HttpDirectory`]: JSON over HTTP with bearer-token auth
//! - [`MemoryDirectory`]: in-process directory with scripted failures,
//!   used by the test suite and the CLI's demo mode

mod http;
mod memory;

use async_trait::async_trait;

use crate::error::RemoteResult;
use crate::models::{Identity, RemoteRecord};

pub use http::HttpDirectory;
pub use memory::{MemoryDirectory, RemoteCall};

/// The five operations the entry store consumes
///
/// Every call carries the caller's identity; whether the token is valid
/// is for the directory to decide.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Fetch the full collection
    async fn list(&self, identity: &Identity) -> RemoteResult<Vec<RemoteRecord>>;

    /// Create an entry for `url`
    async fn insert(&self, identity: &Identity, url: &str) -> RemoteResult<()>;

    /// Remove the entry for `url`
    async fn delete(&self, identity: &Identity, url: &str) -> RemoteResult<()>;

    /// Re-key an entry, keeping its counters
    async fn rename(&self, identity: &Identity, old_url: &str, new_url: &str) -> RemoteResult<()>;

    /// Bump the click counter and last-clicked time
    async fn increment_click(&self, identity: &Identity, url: &str) -> RemoteResult<()>;
}
