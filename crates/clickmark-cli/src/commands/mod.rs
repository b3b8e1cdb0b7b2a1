//! Command handlers

pub mod config;
pub mod entry;
pub mod shell;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use tracing::debug;

use clickmark_core::format::{ensure_scheme, normalize_for_display};
use clickmark_core::{Config, Entry, EntryStore, HttpDirectory, Identity, MemoryDirectory, StoreError};

/// Principal used by `--memory` when no identity is configured
const DEMO_PRINCIPAL: &str = "demo";

/// A store plus the identity the session should sign in as
pub struct Connection {
    pub store: EntryStore,
    pub identity: Option<Identity>,
}

impl Connection {
    /// The configured identity, or an error telling the user how to set one
    pub fn require_identity(&self) -> Result<Identity> {
        self.identity.clone().context(
            "Not signed in. Set a token with `clickmark config set token <TOKEN>` \
             (or CLICKMARK_TOKEN), or try `--memory`.",
        )
    }
}

/// Build the store against the configured backend
///
/// `--memory` uses an in-process directory seeded with a few entries so
/// every command can be tried without a server.
pub async fn connect(config: &Config, memory: bool) -> Result<Connection> {
    let timeout = config.request_timeout();

    if memory {
        let identity = config
            .identity()
            .unwrap_or_else(|| Identity::new(DEMO_PRINCIPAL, DEMO_PRINCIPAL));
        let directory = MemoryDirectory::new();
        directory
            .seed(&identity.principal, demo_entries())
            .await;
        debug!(principal = %identity.principal, "using in-memory directory");

        return Ok(Connection {
            store: EntryStore::new(Arc::new(directory), timeout),
            identity: Some(identity),
        });
    }

    let api_url = config.api_url.as_deref().context(
        "No API URL configured. Set one with `clickmark config set api_url <URL>` \
         (or CLICKMARK_API_URL), or try `--memory`.",
    )?;
    let directory = HttpDirectory::new(api_url, timeout).context("Failed to create HTTP client")?;
    debug!(base_url = directory.base_url(), "using HTTP directory");

    Ok(Connection {
        store: EntryStore::new(Arc::new(directory), timeout),
        identity: config.identity(),
    })
}

fn demo_entries() -> Vec<Entry> {
    let now = chrono::Utc::now();
    let mut docs = Entry::new("https://doc.rust-lang.org/book/", now - Duration::days(3));
    docs.click_count = 4;
    docs.last_clicked = Some(now - Duration::hours(2));

    let mut crates = Entry::new("https://crates.io", now - Duration::days(2));
    crates.click_count = 1;
    crates.last_clicked = Some(now - Duration::days(1));

    vec![
        docs,
        crates,
        Entry::new("https://www.example.com/", now - Duration::hours(5)),
    ]
}

/// Find the stored URL a user meant
///
/// Accepts a 1-based position in the current listing, the stored URL, its
/// display form, or the URL without a scheme.
pub fn resolve_target(entries: &[Entry], target: &str) -> Option<String> {
    let target = target.trim();

    if let Ok(n) = target.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| entries.get(i))
            .map(|e| e.url.clone());
    }

    let with_scheme = ensure_scheme(target);
    entries
        .iter()
        .find(|e| e.url == target || e.url == with_scheme)
        .or_else(|| {
            entries
                .iter()
                .find(|e| normalize_for_display(&e.url) == normalize_for_display(target))
        })
        .map(|e| e.url.clone())
}

/// Resolve `target` or fail with a readable error
pub fn require_target(entries: &[Entry], target: &str) -> Result<String> {
    resolve_target(entries, target).ok_or_else(|| anyhow!("No entry matches '{}'", target))
}

/// Turn a store error into a top-level error, keeping the hint
pub fn explain(error: StoreError) -> anyhow::Error {
    match error.recovery_suggestion() {
        Some(hint) => anyhow!("{}\n  {}", error, hint),
        None => anyhow::Error::new(error),
    }
}
