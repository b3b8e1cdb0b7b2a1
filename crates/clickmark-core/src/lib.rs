//! Clickmark Core Library
//!
//! This crate provides the core functionality for clickmark, a per-user
//! bookmark list kept in a remote directory, with click counts and
//! last-visit times.
//!
//! # Architecture
//!
//! - **Remote directory**: Source of truth; one collection per principal
//! - **Entry store**: In-memory copy, reconciled per operation
//!
//! Each operation has a fixed mutation policy (see [`policy`]). Deletes
//! apply locally first and reload on failure; inserts, renames and clicks
//! wait for the remote to confirm.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let remote = HttpDirectory::new(&api_url, config.request_timeout())?;
//! let store = EntryStore::new(Arc::new(remote), config.request_timeout());
//!
//! store.sign_in(identity).await?;
//! store.insert("example.com").await?;
//! store.sort(SortKey::ClickCount).await;
//! ```
//!
//! # Modules
//!
//! - `store`: Entry store (main entry point)
//! - `models`: Entries, remote rows, identity
//! - `remote`: Remote directory trait plus HTTP and in-memory backends
//! - `validation`: Insert and rename checks
//! - `sort`: Orderings and shuffle
//! - `format`: Display helpers
//! - `policy`: Per-operation mutation policy
//! - `config`: Application configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod policy;
pub mod remote;
pub mod sort;
pub mod store;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{RemoteError, StoreError, ValidationError};
pub use models::{Entry, Identity, RemoteRecord, MAX_ENTRIES, MAX_URL_LEN};
pub use policy::{FailureRecovery, MutationPolicy, Operation};
pub use remote::{HttpDirectory, MemoryDirectory, RemoteDirectory};
pub use sort::{SortKey, SortState};
pub use store::{EditFlush, EntryStore, EntryView, Epoch, Phase, Snapshot};
