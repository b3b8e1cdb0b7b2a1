//! Entry command handlers
//!
//! Each handler signs in (which loads the collection), performs one
//! operation, and prints the result.

use anyhow::{Context, Result};
use tracing::warn;

use clickmark_core::format::normalize_for_display;
use clickmark_core::{EntryStore, SortKey};

use super::{explain, require_target, Connection};
use crate::output::Output;
use crate::prompt::confirm;

async fn signed_in(conn: &Connection) -> Result<&EntryStore> {
    let identity = conn.require_identity()?;
    conn.store.sign_in(identity).await.map_err(explain)?;
    Ok(&conn.store)
}

/// List entries, optionally reordered
pub async fn list(
    conn: &Connection,
    sort: Option<SortKey>,
    reverse: bool,
    shuffle: bool,
    output: &Output,
) -> Result<()> {
    let store = signed_in(conn).await?;

    if let Some(key) = sort {
        store.sort(key).await;
        // Second application flips to the other direction
        if reverse {
            store.sort(key).await;
        }
    }
    if shuffle {
        store.shuffle().await;
    }

    output.print_snapshot(&store.snapshot().await, store.now());
    Ok(())
}

/// Add a new entry
pub async fn add(conn: &Connection, url: String, output: &Output) -> Result<()> {
    let store = signed_in(conn).await?;

    let entry = store.insert(&url).await.map_err(explain)?;

    output.success(&format!("Added {}", normalize_for_display(&entry.url)));
    output.print_entry(&entry, store.now());
    Ok(())
}

/// Delete an entry
pub async fn remove(conn: &Connection, target: String, output: &Output) -> Result<()> {
    let store = signed_in(conn).await?;
    let url = require_target(&store.entries().await, &target)?;

    if output.should_prompt() {
        println!("Delete {}", url);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete(&url).await.map_err(explain)?;

    output.success(&format!("Deleted {}", normalize_for_display(&url)));
    Ok(())
}

/// Change an entry's URL, keeping its counters
pub async fn rename(conn: &Connection, target: String, new_url: String, output: &Output) -> Result<()> {
    let store = signed_in(conn).await?;
    let url = require_target(&store.entries().await, &target)?;

    let entry = store.rename(&url, &new_url).await.map_err(explain)?;

    output.success(&format!(
        "Renamed {} to {}",
        normalize_for_display(&url),
        normalize_for_display(&entry.url)
    ));
    output.print_entry(&entry, store.now());
    Ok(())
}

/// Record a click and open the entry in the browser
///
/// The browser opens even if the click could not be recorded.
pub async fn open(conn: &Connection, target: String, no_browser: bool, output: &Output) -> Result<()> {
    let store = signed_in(conn).await?;
    let url = require_target(&store.entries().await, &target)?;

    if !no_browser {
        open::that(&url).with_context(|| format!("Failed to open {} in the browser", url))?;
    }

    match store.increment_click(&url).await {
        Ok(entry) => output.print_entry(&entry, store.now()),
        Err(e) => {
            warn!(%url, "click not recorded: {}", e);
            output.failure(&e);
        }
    }
    Ok(())
}
