//! Data models for clickmark
//!
//! Defines the bookmark entry, the row shape returned by the remote
//! directory, and the caller identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of entries a collection may hold
pub const MAX_ENTRIES: usize = 200;

/// Maximum accepted URL length, in characters
pub const MAX_URL_LEN: usize = 2083;

/// A saved bookmark
///
/// The URL is the primary key; there is no separate id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// The stored URL (always carries a scheme)
    pub url: String,
    /// Confirmed click-throughs
    pub click_count: u64,
    /// When the entry was last clicked, if ever
    pub last_clicked: Option<DateTime<Utc>>,
    /// When the entry was created
    pub inserted_at: DateTime<Utc>,
}

impl Entry {
    /// Create a fresh, never-clicked entry
    pub fn new(url: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            click_count: 0,
            last_clicked: None,
            inserted_at: now,
        }
    }

    /// Build an entry from a remote row
    pub fn from_record(record: RemoteRecord) -> Self {
        Self {
            url: record.url,
            click_count: record.click_count,
            last_clicked: record.last_clicked,
            inserted_at: record.inserted_at,
        }
    }

    /// Apply one confirmed click
    pub fn record_click(&mut self, now: DateTime<Utc>) {
        self.click_count = self.click_count.saturating_add(1);
        self.last_clicked = Some(now);
    }
}

/// One row as returned by the remote directory's `list`
///
/// Timestamps travel as seconds since the epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub url: String,
    #[serde(default)]
    pub click_count: u64,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub last_clicked: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub inserted_at: DateTime<Utc>,
}

impl From<&Entry> for RemoteRecord {
    fn from(entry: &Entry) -> Self {
        Self {
            url: entry.url.clone(),
            click_count: entry.click_count,
            last_clicked: entry.last_clicked,
            inserted_at: entry.inserted_at,
        }
    }
}

/// The authenticated caller
///
/// Presence of an identity is the only authorization check done locally;
/// whether the token is valid is up to the remote directory.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display identifier for the signed-in user
    pub principal: String,
    token: String,
}

impl Identity {
    pub fn new(principal: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            token: token.into(),
        }
    }

    /// The opaque bearer token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("principal", &self.principal)
            .field("token", &"<redacted>")
            .finish()
    }
}
