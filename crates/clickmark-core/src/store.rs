//! Entry store
//!
//! The `EntryStore` owns the in-memory bookmark collection and mediates
//! every call to the remote directory. It keeps one ordering at a time and
//! reconciles local state with the remote according to the policy table
//! in [`crate::policy`].
//!
//! ## Concurrency
//!
//! All operations take `&self` and may be in flight together. State lives
//! behind a lock that is never held across a remote call. Whole-collection
//! writes (load, the reload after a failed delete, and an insert's
//! confirm-and-prepend) also take a single-writer gate so they apply in
//! arrival order. Per-URL busy markers are tickets: a completion only
//! clears the marker it set.
//!
//! ## Epochs
//!
//! Sign-in, sign-out and every applied load open a new epoch. A
//! confirm-then-apply result whose epoch has passed is discarded.
//!
//! ## Usage
//!
//! ```ignore
//! let store = EntryStore::new(Arc::new(directory), Duration::from_secs(10));
//! store.sign_in(identity).await?;
//!
//! store.insert("example.com").await?;
//! store.sort(SortKey::Alphabetical).await;
//!
//! let snapshot = store.snapshot().await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use rand::Rng;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{RemoteError, RemoteResult, StoreError, StoreResult, ValidationError};
use crate::models::{Entry, Identity};
use crate::policy::{FailureRecovery, MutationPolicy, Operation};
use crate::remote::RemoteDirectory;
use crate::sort::{self, SortKey, SortState};
use crate::validation::{self, validate_insert, validate_rename};

/// Whole-collection lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing loaded for the current identity (or no identity)
    #[default]
    Unloaded,
    /// A full fetch is in flight
    Loading,
    /// A snapshot from the remote is available
    Ready,
}

/// Marker for one session's view of the data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Epoch(pub u64);

impl Epoch {
    fn next(self) -> Self {
        Epoch(self.0 + 1)
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Ticket = u64;

/// URL-keyed busy markers
#[derive(Debug, Default)]
struct Markers(HashMap<String, Vec<Ticket>>);

impl Markers {
    fn mark(&mut self, url: &str, ticket: Ticket) {
        self.0.entry(url.to_string()).or_default().push(ticket);
    }

    /// Clear one ticket; false if it was already gone
    fn release(&mut self, url: &str, ticket: Ticket) -> bool {
        let Some(tickets) = self.0.get_mut(url) else {
            return false;
        };
        let Some(pos) = tickets.iter().position(|t| *t == ticket) else {
            return false;
        };
        tickets.remove(pos);
        if tickets.is_empty() {
            self.0.remove(url);
        }
        true
    }

    fn contains(&self, url: &str) -> bool {
        self.0.contains_key(url)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.0.keys().cloned().collect();
        urls.sort();
        urls
    }
}

#[derive(Debug, Default)]
struct State {
    identity: Option<Identity>,
    phase: Phase,
    epoch: Epoch,
    entries: Vec<Entry>,
    deleting: Markers,
    renaming: Markers,
    clicking: Markers,
    /// Target URLs of inserts and renames still in flight
    claimed: Markers,
    submitting: Vec<Ticket>,
    edit_mode: bool,
    /// Buffered edits keyed by the entry's stored URL
    edits: HashMap<String, String>,
    sort: SortState,
}

impl State {
    /// Drop everything tied to the current session and open a new epoch
    fn reset(&mut self, identity: Option<Identity>) {
        let epoch = self.epoch.next();
        *self = State {
            identity,
            epoch,
            ..State::default()
        };
    }

    fn require_identity(&self, op: Operation) -> StoreResult<Identity> {
        debug_assert!(op.requires_identity());
        self.identity.clone().ok_or(StoreError::NotSignedIn)
    }

    fn position(&self, url: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.url == url)
    }

    fn entry_mut(&mut self, url: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.url == url)
    }

    fn contains(&self, url: &str) -> bool {
        self.position(url).is_some()
    }

    fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.url.as_str())
    }

    /// Stored URLs plus the ones pending writes are about to create
    fn taken(&self) -> impl Iterator<Item = &str> {
        self.urls().chain(self.claimed.keys())
    }
}

/// One row of the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: Entry,
    /// A rename of this entry is in flight
    pub renaming: bool,
    /// A click increment for this entry is in flight
    pub clicking: bool,
    /// Buffered edit value, if any
    pub draft: Option<String>,
}

/// Read-only view of the store for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub epoch: Epoch,
    pub principal: Option<String>,
    pub entries: Vec<EntryView>,
    /// URLs with a delete in flight (already gone from `entries`)
    pub deleting: Vec<String>,
    /// An insert is in flight
    pub submitting: bool,
    pub edit_mode: bool,
    pub sort: SortState,
}

/// Outcome of leaving edit mode
#[derive(Debug, Default)]
pub struct EditFlush {
    /// `(old, new)` pairs the remote confirmed
    pub renamed: Vec<(String, String)>,
    /// Edits that were discarded, with the reason
    pub failed: Vec<(String, StoreError)>,
}

/// In-memory bookmark collection kept consistent with a remote directory
pub struct EntryStore {
    remote: Arc<dyn RemoteDirectory>,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
    state: Mutex<State>,
    /// Single-writer gate for whole-collection writes
    writer: Mutex<()>,
    next_ticket: AtomicU64,
}

impl EntryStore {
    /// Create a store that talks to `remote`
    pub fn new(remote: Arc<dyn RemoteDirectory>, request_timeout: Duration) -> Self {
        Self::with_clock(remote, request_timeout, Arc::new(SystemClock))
    }

    /// Create a store with a specific clock
    pub fn with_clock(remote: Arc<dyn RemoteDirectory>, request_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            remote,
            clock,
            request_timeout,
            state: Mutex::new(State::default()),
            writer: Mutex::new(()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Current time according to the store's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn ticket(&self) -> Ticket {
        self.next_ticket.fetch_add(1, Ordering::Relaxed)
    }

    /// Take the single-writer gate if `op` writes the whole collection
    async fn gate(&self, op: Operation) -> Option<MutexGuard<'_, ()>> {
        if op.is_collection_write() {
            Some(self.writer.lock().await)
        } else {
            None
        }
    }

    /// Run a remote call under the request timeout
    async fn call<T, F>(&self, op: Operation, fut: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        let result = match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.request_timeout)),
        };
        if let Err(ref e) = result {
            warn!(%op, "remote call failed: {}", e);
        }
        result
    }

    /// Apply a confirm-then-apply result if its epoch is still current
    ///
    /// On failure nothing local has changed, so the pending change is
    /// simply discarded.
    fn settle<T>(
        state: &mut State,
        op: Operation,
        epoch: Epoch,
        result: RemoteResult<()>,
        apply: impl FnOnce(&mut State) -> StoreResult<T>,
    ) -> StoreResult<T> {
        debug_assert_eq!(op.policy(), MutationPolicy::ConfirmThenApply);

        if state.epoch != epoch {
            debug!(%op, started = %epoch, current = %state.epoch, "discarding stale result");
            return Err(StoreError::Stale);
        }

        match result {
            Ok(()) => apply(state),
            Err(e) => {
                debug_assert_eq!(op.recovery(), FailureRecovery::Discard);
                Err(e.into())
            }
        }
    }

    // ==================== Session ====================

    /// Become `identity` and load its collection
    ///
    /// Any prior state is dropped, including results still in flight.
    pub async fn sign_in(&self, identity: Identity) -> StoreResult<usize> {
        {
            let mut state = self.state.lock().await;
            info!(principal = %identity.principal, "signing in");
            state.reset(Some(identity));
        }
        self.load().await
    }

    /// Drop the identity and all collection state
    ///
    /// In-flight calls are not cancelled; their results are ignored.
    pub async fn sign_out(&self) {
        let mut state = self.state.lock().await;
        info!("signing out");
        state.reset(None);
    }

    pub async fn is_signed_in(&self) -> bool {
        self.state.lock().await.identity.is_some()
    }

    // ==================== Load ====================

    /// Fetch the full collection and replace the local copy
    ///
    /// Entries come back newest first. On failure the prior entries are
    /// kept and the error is returned; retrying is up to the caller.
    pub async fn load(&self) -> StoreResult<usize> {
        let _writer = self.gate(Operation::Load).await;
        self.load_exclusive().await
    }

    /// Load body; caller holds the writer gate
    async fn load_exclusive(&self) -> StoreResult<usize> {
        let (identity, epoch, prior_phase) = {
            let mut state = self.state.lock().await;
            let identity = state.require_identity(Operation::Load)?;
            let prior_phase = state.phase;
            state.phase = Phase::Loading;
            debug!(epoch = %state.epoch, "loading collection");
            (identity, state.epoch, prior_phase)
        };

        let result = self.call(Operation::Load, self.remote.list(&identity)).await;

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!("discarding load for a previous session");
            return Err(StoreError::Stale);
        }

        match result {
            Ok(records) => {
                let mut entries: Vec<Entry> = records
                    .into_iter()
                    .map(Entry::from_record)
                    // A pending delete must not be resurrected by this read
                    .filter(|e| !state.deleting.contains(&e.url))
                    .collect();
                sort::sort_newest_first(&mut entries);

                let count = entries.len();
                state.entries = entries;
                let State { edits, entries, .. } = &mut *state;
                edits.retain(|url, _| entries.iter().any(|e| &e.url == url));

                state.phase = Phase::Ready;
                state.epoch = state.epoch.next();
                info!(count, epoch = %state.epoch, "collection loaded");
                Ok(count)
            }
            Err(e) => {
                state.phase = prior_phase;
                Err(e.into())
            }
        }
    }

    // ==================== Insert ====================

    /// Validate `raw`, insert it remotely, and prepend it on success
    ///
    /// Validation failures return before any remote call. New entries are
    /// placed at the front regardless of the current sort.
    pub async fn insert(&self, raw: &str) -> StoreResult<Entry> {
        // Fail fast without waiting for the writer gate
        {
            let state = self.state.lock().await;
            state.require_identity(Operation::Insert)?;
            validate_insert(raw, state.taken(), state.entries.len())?;
        }

        let _writer = self.gate(Operation::Insert).await;

        let (identity, url, epoch, ticket) = {
            let mut state = self.state.lock().await;
            let identity = state.require_identity(Operation::Insert)?;
            let url = validate_insert(raw, state.taken(), state.entries.len())?;
            let ticket = self.ticket();
            state.submitting.push(ticket);
            state.claimed.mark(&url, ticket);
            debug!(%url, "submitting insert");
            (identity, url, state.epoch, ticket)
        };

        let result = self
            .call(Operation::Insert, self.remote.insert(&identity, &url))
            .await;

        let mut state = self.state.lock().await;
        state.submitting.retain(|t| *t != ticket);
        state.claimed.release(&url, ticket);
        let now = self.clock.now();
        Self::settle(&mut state, Operation::Insert, epoch, result, |state| {
            if state.contains(&url) {
                warn!(%url, "inserted URL already present locally");
                return Err(ValidationError::DuplicateEntry { url }.into());
            }
            let entry = Entry::new(url, now);
            state.entries.insert(0, entry.clone());
            info!(url = %entry.url, "entry inserted");
            Ok(entry)
        })
    }

    // ==================== Delete ====================

    /// Remove an entry now and delete it remotely
    ///
    /// If the remote delete fails, the whole collection is reloaded so the
    /// local copy matches the server exactly.
    pub async fn delete(&self, url: &str) -> StoreResult<()> {
        let (identity, ticket) = {
            let mut state = self.state.lock().await;
            let identity = state.require_identity(Operation::Delete)?;
            let pos = state.position(url).ok_or_else(|| StoreError::NotFound {
                url: url.to_string(),
            })?;
            state.entries.remove(pos);
            state.edits.remove(url);
            let ticket = self.ticket();
            state.deleting.mark(url, ticket);
            debug!(%url, "optimistically removed");
            (identity, ticket)
        };

        let result = self
            .call(Operation::Delete, self.remote.delete(&identity, url))
            .await;

        let cause = match result {
            Ok(()) => {
                let mut state = self.state.lock().await;
                if state.deleting.release(url, ticket) {
                    info!(%url, "entry deleted");
                }
                return Ok(());
            }
            Err(cause) => cause,
        };

        match Operation::Delete.recovery() {
            FailureRecovery::Reload => self.reload_after_failed_delete(url, ticket, cause).await,
            _ => Err(cause.into()),
        }
    }

    async fn reload_after_failed_delete(&self, url: &str, ticket: Ticket, cause: RemoteError) -> StoreResult<()> {
        let _writer = self.gate(Operation::Delete).await;

        {
            let mut state = self.state.lock().await;
            // Marker gone means the session ended while the call was out
            if !state.deleting.release(url, ticket) {
                debug!(%url, "delete failed after sign-out; not reloading");
                return Err(StoreError::Stale);
            }
        }

        warn!(%url, "delete failed, reloading collection");
        match self.load_exclusive().await {
            Ok(_) => Err(cause.into()),
            Err(StoreError::RemoteUnavailable(reload) | StoreError::RemoteRejected(reload)) => Err(StoreError::Reload {
                url: url.to_string(),
                cause,
                reload,
            }),
            Err(other) => Err(other),
        }
    }

    // ==================== Click ====================

    /// Record a click-through once the remote confirms it
    ///
    /// Nothing changes locally unless the remote call succeeds.
    pub async fn increment_click(&self, url: &str) -> StoreResult<Entry> {
        let (identity, epoch, ticket) = {
            let mut state = self.state.lock().await;
            let identity = state.require_identity(Operation::IncrementClick)?;
            if !state.contains(url) {
                return Err(StoreError::NotFound { url: url.to_string() });
            }
            let ticket = self.ticket();
            state.clicking.mark(url, ticket);
            (identity, state.epoch, ticket)
        };

        let result = self
            .call(Operation::IncrementClick, self.remote.increment_click(&identity, url))
            .await;

        let mut state = self.state.lock().await;
        state.clicking.release(url, ticket);
        let now = self.clock.now();
        Self::settle(&mut state, Operation::IncrementClick, epoch, result, |state| {
            let entry = state.entry_mut(url).ok_or_else(|| StoreError::NotFound {
                url: url.to_string(),
            })?;
            entry.record_click(now);
            debug!(%url, clicks = entry.click_count, "click recorded");
            Ok(entry.clone())
        })
    }

    // ==================== Rename ====================

    /// Re-key an entry once the remote confirms
    ///
    /// `new_value` goes through the same checks as an insert (minus the
    /// size cap). On failure the entry keeps its original URL.
    pub async fn rename(&self, url: &str, new_value: &str) -> StoreResult<Entry> {
        let (identity, new_url, epoch, ticket) = {
            let mut state = self.state.lock().await;
            let identity = state.require_identity(Operation::Rename)?;
            if !state.contains(url) {
                return Err(StoreError::NotFound { url: url.to_string() });
            }
            if state.renaming.contains(url) {
                return Err(StoreError::RenameInFlight { url: url.to_string() });
            }
            let others = state.taken().filter(|u| *u != url);
            let new_url = validate_rename(new_value, others, url)?;
            let ticket = self.ticket();
            state.renaming.mark(url, ticket);
            state.claimed.mark(&new_url, ticket);
            (identity, new_url, state.epoch, ticket)
        };

        let result = self
            .call(Operation::Rename, self.remote.rename(&identity, url, &new_url))
            .await;

        let mut state = self.state.lock().await;
        state.renaming.release(url, ticket);
        state.claimed.release(&new_url, ticket);
        Self::settle(&mut state, Operation::Rename, epoch, result, |state| {
            if state.contains(&new_url) {
                warn!(from = %url, to = %new_url, "rename target already present locally");
                return Err(ValidationError::DuplicateEntry { url: new_url }.into());
            }
            let entry = state.entry_mut(url).ok_or_else(|| StoreError::NotFound {
                url: url.to_string(),
            })?;
            entry.url = new_url;
            info!(from = %url, to = %entry.url, "entry renamed");
            Ok(entry.clone())
        })
    }

    // ==================== Edit mode ====================

    /// Start editing an entry; the buffer starts from the stored URL
    ///
    /// Returns the current buffered value if one already exists.
    pub async fn begin_edit(&self, url: &str) -> StoreResult<String> {
        let mut state = self.state.lock().await;
        if !state.edit_mode {
            return Err(StoreError::NotEditing);
        }
        if !state.contains(url) {
            return Err(StoreError::NotFound { url: url.to_string() });
        }
        Ok(state
            .edits
            .entry(url.to_string())
            .or_insert_with(|| url.to_string())
            .clone())
    }

    /// Buffer an edited value for an entry
    pub async fn set_edit(&self, url: &str, value: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.edit_mode {
            return Err(StoreError::NotEditing);
        }
        if !state.contains(url) {
            return Err(StoreError::NotFound { url: url.to_string() });
        }
        state.edits.insert(url.to_string(), value.to_string());
        Ok(())
    }

    /// The edit field for `url` lost focus: rename if the value changed
    ///
    /// Returns the renamed entry, or `None` when there was nothing to send.
    /// The buffered value is dropped either way.
    pub async fn commit_edit(&self, url: &str) -> StoreResult<Option<Entry>> {
        let value = {
            let mut state = self.state.lock().await;
            match state.edits.remove(url) {
                Some(value) if value != url => value,
                _ => return Ok(None),
            }
        };
        self.rename_edit(url, &value).await
    }

    async fn rename_edit(&self, url: &str, value: &str) -> StoreResult<Option<Entry>> {
        match self.rename(url, value).await {
            Ok(entry) => Ok(Some(entry)),
            Err(StoreError::Validation(ValidationError::Unchanged)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Enter or leave edit mode
    ///
    /// Entering has no side effects. Leaving sends one rename per changed
    /// entry, all at once, and switches edit mode off when they settle.
    /// Edits that normalize to the same URL all fail as duplicates and are
    /// never sent.
    pub async fn toggle_edit_mode(&self) -> EditFlush {
        let pending: Vec<(String, String)> = {
            let mut state = self.state.lock().await;
            if !state.edit_mode {
                state.edit_mode = true;
                debug!("edit mode on");
                return EditFlush::default();
            }
            state
                .edits
                .drain()
                .filter(|(url, value)| url != value)
                .collect()
        };

        let targets: Vec<Option<String>> = pending
            .iter()
            .map(|(_, value)| validation::normalize_input(value).ok())
            .collect();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for target in targets.iter().flatten() {
            *counts.entry(target.clone()).or_default() += 1;
        }

        let mut flush = EditFlush::default();
        let mut sending = Vec::with_capacity(pending.len());
        for ((url, value), target) in pending.into_iter().zip(targets) {
            match target {
                Some(target) if counts[&target] > 1 => {
                    debug!(%url, %target, "edit collides with another edit");
                    flush
                        .failed
                        .push((url, ValidationError::DuplicateEntry { url: target }.into()));
                }
                _ => sending.push((url, value)),
            }
        }

        let results = join_all(
            sending
                .iter()
                .map(|(url, value)| self.rename_edit(url, value)),
        )
        .await;

        for ((url, _), result) in sending.into_iter().zip(results) {
            match result {
                Ok(Some(entry)) => flush.renamed.push((url, entry.url)),
                Ok(None) => {}
                Err(e) => flush.failed.push((url, e)),
            }
        }

        let mut state = self.state.lock().await;
        state.edit_mode = false;
        debug!(
            renamed = flush.renamed.len(),
            failed = flush.failed.len(),
            "edit mode off"
        );
        flush
    }

    // ==================== Ordering ====================

    /// Re-sort by `key` in its current direction, then flip that direction
    pub async fn sort(&self, key: SortKey) {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let State { sort, entries, .. } = &mut *state;
        sort.apply(key, entries, now);
        debug!(?key, "sorted");
    }

    /// Randomly permute the collection
    pub async fn shuffle(&self) {
        let mut state = self.state.lock().await;
        sort::shuffle(&mut state.entries, &mut rand::rng());
    }

    /// Randomly permute the collection with a specific RNG
    pub async fn shuffle_with<R: Rng + Send>(&self, rng: &mut R) {
        let mut state = self.state.lock().await;
        sort::shuffle(&mut state.entries, rng);
    }

    // ==================== Queries ====================

    /// Current ordered entries
    pub async fn entries(&self) -> Vec<Entry> {
        self.state.lock().await.entries.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    pub async fn epoch(&self) -> Epoch {
        self.state.lock().await.epoch
    }

    pub async fn is_submitting(&self) -> bool {
        !self.state.lock().await.submitting.is_empty()
    }

    /// Ordered entries plus busy flags, for rendering
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        let entries = state
            .entries
            .iter()
            .map(|entry| EntryView {
                entry: entry.clone(),
                renaming: state.renaming.contains(&entry.url),
                clicking: state.clicking.contains(&entry.url),
                draft: state.edits.get(&entry.url).cloned(),
            })
            .collect();

        Snapshot {
            phase: state.phase,
            epoch: state.epoch,
            principal: state.identity.as_ref().map(|i| i.principal.clone()),
            entries,
            deleting: state.deleting.urls(),
            submitting: !state.submitting.is_empty(),
            edit_mode: state.edit_mode,
            sort: state.sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::MAX_ENTRIES;
    use crate::remote::MemoryDirectory;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn alice() -> Identity {
        Identity::new("alice", "token-a")
    }

    /// Entries inserted one second apart, so the last one is newest
    fn seeded(urls: &[&str]) -> Vec<Entry> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| Entry::new(*url, t0() + chrono::Duration::seconds(i as i64)))
            .collect()
    }

    struct Fixture {
        dir: Arc<MemoryDirectory>,
        clock: Arc<ManualClock>,
        store: EntryStore,
    }

    fn fixture_with_timeout(timeout: Duration) -> Fixture {
        let clock = Arc::new(ManualClock::new(t0() + chrono::Duration::hours(1)));
        let dir = Arc::new(MemoryDirectory::with_clock(clock.clone()));
        let store = EntryStore::with_clock(dir.clone(), timeout, clock.clone());
        Fixture { dir, clock, store }
    }

    async fn signed_in(urls: &[&str]) -> Fixture {
        let f = fixture_with_timeout(Duration::from_secs(5));
        f.dir.seed("alice", seeded(urls)).await;
        f.store.sign_in(alice()).await.unwrap();
        f
    }

    fn urls(entries: &[Entry]) -> Vec<String> {
        entries.iter().map(|e| e.url.clone()).collect()
    }

    fn sorted_urls(entries: &[Entry]) -> Vec<String> {
        let mut urls = urls(entries);
        urls.sort();
        urls
    }

    async fn server_urls(f: &Fixture) -> Vec<String> {
        f.dir.records("alice").await.into_iter().map(|r| r.url).collect()
    }

    // ==================== Session and load ====================

    #[tokio::test]
    async fn test_sign_in_loads_newest_first() {
        let f = signed_in(&["https://a.io", "https://b.io", "https://c.io"]).await;

        assert_eq!(f.store.phase().await, Phase::Ready);
        assert_eq!(
            urls(&f.store.entries().await),
            vec!["https://c.io", "https://b.io", "https://a.io"]
        );
    }

    #[tokio::test]
    async fn test_operations_require_identity() {
        let f = fixture_with_timeout(Duration::from_secs(5));

        assert_eq!(f.store.insert("a.io").await.unwrap_err(), StoreError::NotSignedIn);
        assert_eq!(f.store.delete("https://a.io").await.unwrap_err(), StoreError::NotSignedIn);
        assert_eq!(f.store.load().await.unwrap_err(), StoreError::NotSignedIn);
        assert_eq!(
            f.store.increment_click("https://a.io").await.unwrap_err(),
            StoreError::NotSignedIn
        );
        assert_eq!(
            f.store.rename("https://a.io", "b.io").await.unwrap_err(),
            StoreError::NotSignedIn
        );
        assert!(f.dir.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_everything() {
        let f = signed_in(&["https://a.io"]).await;
        f.store.toggle_edit_mode().await;
        f.store.sort(SortKey::Alphabetical).await;

        f.store.sign_out().await;

        let snap = f.store.snapshot().await;
        assert_eq!(snap.phase, Phase::Unloaded);
        assert!(snap.entries.is_empty());
        assert!(snap.principal.is_none());
        assert!(!snap.edit_mode);
        assert_eq!(snap.sort, SortState::default());
    }

    #[tokio::test]
    async fn test_switching_identity_replaces_collection() {
        let f = signed_in(&["https://a.io"]).await;
        f.dir.seed("bob", seeded(&["https://bob.io"])).await;

        f.store.sign_in(Identity::new("bob", "token-b")).await.unwrap();

        assert_eq!(urls(&f.store.entries().await), vec!["https://bob.io"]);
        assert_eq!(f.store.snapshot().await.principal.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_load_failure_keeps_prior_entries() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;
        let before = f.store.entries().await;

        f.dir
            .fail_next(Operation::Load, RemoteError::Unavailable("down".into()))
            .await;
        let err = f.store.load().await.unwrap_err();

        assert!(matches!(err, StoreError::RemoteUnavailable(_)));
        assert_eq!(f.store.entries().await, before);
        assert_eq!(f.store.phase().await, Phase::Ready);
    }

    #[tokio::test]
    async fn test_first_load_failure_stays_unloaded() {
        let f = fixture_with_timeout(Duration::from_secs(5));
        f.dir
            .fail_next(Operation::Load, RemoteError::Unavailable("down".into()))
            .await;

        assert!(f.store.sign_in(alice()).await.is_err());
        assert_eq!(f.store.phase().await, Phase::Unloaded);
        assert!(f.store.is_signed_in().await);

        // Retrying is up to the caller
        assert_eq!(f.store.load().await.unwrap(), 0);
        assert_eq!(f.store.phase().await, Phase::Ready);
    }

    #[tokio::test]
    async fn test_load_advances_epoch() {
        let f = signed_in(&["https://a.io"]).await;
        let before = f.store.epoch().await;
        f.store.load().await.unwrap();
        assert!(f.store.epoch().await > before);
    }

    // ==================== Insert ====================

    #[tokio::test]
    async fn test_insert_prefixes_and_prepends() {
        let f = signed_in(&["https://a.io"]).await;

        let entry = f.store.insert("  example.com ").await.unwrap();

        assert_eq!(entry.url, "https://example.com");
        assert_eq!(entry.click_count, 0);
        assert!(entry.last_clicked.is_none());
        assert_eq!(entry.inserted_at, f.clock.now());
        assert_eq!(f.store.entries().await[0], entry);
        assert!(server_urls(&f).await.contains(&"https://example.com".to_string()));
    }

    #[tokio::test]
    async fn test_insert_ignores_current_sort() {
        let f = signed_in(&["https://b.io", "https://c.io"]).await;
        f.store.sort(SortKey::Alphabetical).await;

        f.store.insert("https://z.io").await.unwrap();

        assert_eq!(
            urls(&f.store.entries().await),
            vec!["https://z.io", "https://b.io", "https://c.io"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_insert_never_reaches_remote() {
        let f = signed_in(&["https://a.io"]).await;

        let err = f.store.insert("a.io").await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Validation(ValidationError::DuplicateEntry {
                url: "https://a.io".into()
            })
        );

        // http and https are different URLs
        f.store.insert("http://a.io").await.unwrap();

        assert_eq!(f.dir.call_count(Operation::Insert).await, 1);
        assert_eq!(f.store.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_capacity_is_enforced_locally() {
        let f = fixture_with_timeout(Duration::from_secs(5));
        let many: Vec<String> = (0..MAX_ENTRIES).map(|i| format!("https://{}.io", i)).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        f.dir.seed("alice", seeded(&refs)).await;
        f.store.sign_in(alice()).await.unwrap();

        let err = f.store.insert("one-more.io").await.unwrap_err();

        assert_eq!(
            err,
            StoreError::Validation(ValidationError::CapacityExceeded { limit: MAX_ENTRIES })
        );
        assert_eq!(f.dir.call_count(Operation::Insert).await, 0);
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let f = signed_in(&[]).await;
        let err = f.store.insert("   ").await.unwrap_err();
        assert_eq!(err, StoreError::Validation(ValidationError::EmptyInput));
        assert_eq!(f.dir.call_count(Operation::Insert).await, 0);
    }

    #[tokio::test]
    async fn test_insert_failure_changes_nothing() {
        let f = signed_in(&["https://a.io"]).await;
        let before = f.store.entries().await;

        f.dir
            .fail_next(Operation::Insert, RemoteError::Rejected("nope".into()))
            .await;
        let err = f.store.insert("b.io").await.unwrap_err();

        assert!(matches!(err, StoreError::RemoteRejected(_)));
        assert_eq!(f.store.entries().await, before);
        assert!(!f.store.is_submitting().await);
    }

    #[tokio::test]
    async fn test_insert_in_flight_is_visible() {
        let f = signed_in(&["https://a.io"]).await;
        f.dir
            .set_latency(Operation::Insert, Duration::from_millis(50))
            .await;

        let observe = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            (f.store.snapshot().await, f.store.is_submitting().await)
        };
        let (result, (snap, submitting)) = tokio::join!(f.store.insert("b.io"), observe);

        result.unwrap();
        assert!(snap.submitting);
        assert!(submitting);
        assert_eq!(snap.entries.len(), 1);
        assert!(!f.store.is_submitting().await);
    }

    #[tokio::test]
    async fn test_load_waits_for_pending_insert() {
        let f = signed_in(&["https://a.io"]).await;
        f.dir
            .set_latency(Operation::Insert, Duration::from_millis(50))
            .await;

        let reload = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.store.load().await
        };
        let (inserted, loaded) = tokio::join!(f.store.insert("b.io"), reload);

        assert_eq!(inserted.unwrap().url, "https://b.io");
        assert_eq!(loaded.unwrap(), 2);
        assert_eq!(
            sorted_urls(&f.store.entries().await),
            vec!["https://a.io", "https://b.io"]
        );
    }

    #[tokio::test]
    async fn test_failed_delete_reload_keeps_pending_insert() {
        let f = signed_in(&["https://a.io"]).await;
        f.dir
            .set_latency(Operation::Insert, Duration::from_millis(50))
            .await;
        f.dir
            .fail_next(Operation::Delete, RemoteError::Unavailable("offline".into()))
            .await;

        let delete = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.store.delete("https://a.io").await
        };
        let (inserted, deleted) = tokio::join!(f.store.insert("b.io"), delete);

        inserted.unwrap();
        assert!(matches!(deleted.unwrap_err(), StoreError::RemoteUnavailable(_)));

        let mut expected = server_urls(&f).await;
        expected.sort();
        assert_eq!(expected, vec!["https://a.io", "https://b.io"]);
        assert_eq!(sorted_urls(&f.store.entries().await), expected);
        assert_eq!(f.dir.call_count(Operation::Load).await, 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_url_claimed_by_rename() {
        let f = signed_in(&["https://a.io"]).await;
        f.dir
            .set_latency(Operation::Rename, Duration::from_millis(50))
            .await;

        let insert = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.store.insert("x.io").await
        };
        let (renamed, inserted) = tokio::join!(f.store.rename("https://a.io", "x.io"), insert);

        assert_eq!(renamed.unwrap().url, "https://x.io");
        assert_eq!(
            inserted.unwrap_err(),
            StoreError::Validation(ValidationError::DuplicateEntry {
                url: "https://x.io".into()
            })
        );
        assert_eq!(f.dir.call_count(Operation::Insert).await, 0);
        assert_eq!(urls(&f.store.entries().await), vec!["https://x.io"]);
    }

    // ==================== Delete ====================

    #[tokio::test]
    async fn test_delete_success() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;

        f.store.delete("https://a.io").await.unwrap();

        assert_eq!(urls(&f.store.entries().await), vec!["https://b.io"]);
        assert_eq!(server_urls(&f).await, vec!["https://b.io"]);
        assert!(f.store.snapshot().await.deleting.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_url() {
        let f = signed_in(&["https://a.io"]).await;
        let err = f.store.delete("https://nope.io").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(f.dir.call_count(Operation::Delete).await, 0);
    }

    #[tokio::test]
    async fn test_failed_delete_reloads_from_server() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;

        f.dir
            .fail_next(Operation::Delete, RemoteError::Unavailable("down".into()))
            .await;
        let err = f.store.delete("https://a.io").await.unwrap_err();

        assert!(matches!(err, StoreError::RemoteUnavailable(_)));
        // The entry is back because the server still has it
        assert_eq!(sorted_urls(&f.store.entries().await), server_urls(&f).await);
        assert_eq!(f.dir.call_count(Operation::Load).await, 2);
    }

    #[tokio::test]
    async fn test_lost_delete_response_reloads_from_server() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;

        f.dir
            .fail_next_after_apply(Operation::Delete, RemoteError::Unavailable("lost".into()))
            .await;
        assert!(f.store.delete("https://a.io").await.is_err());

        // The server applied it, so the reload confirms the removal
        assert_eq!(urls(&f.store.entries().await), vec!["https://b.io"]);
        assert_eq!(sorted_urls(&f.store.entries().await), server_urls(&f).await);
    }

    #[tokio::test]
    async fn test_failed_delete_and_failed_reload() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;

        f.dir
            .fail_next(Operation::Delete, RemoteError::Rejected("locked".into()))
            .await;
        f.dir
            .fail_next(Operation::Load, RemoteError::Unavailable("down".into()))
            .await;
        let err = f.store.delete("https://a.io").await.unwrap_err();

        match err {
            StoreError::Reload { url, cause, reload } => {
                assert_eq!(url, "https://a.io");
                assert!(matches!(cause, RemoteError::Rejected(_)));
                assert!(reload.is_unavailable());
            }
            other => panic!("expected Reload, got {:?}", other),
        }
        assert!(f.store.snapshot().await.deleting.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_deletes() {
        let f = signed_in(&["https://a.io", "https://b.io", "https://c.io"]).await;
        f.dir
            .set_latency(Operation::Delete, Duration::from_millis(30))
            .await;

        let (a, b) = tokio::join!(f.store.delete("https://a.io"), f.store.delete("https://b.io"));

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(urls(&f.store.entries().await), vec!["https://c.io"]);
        assert!(f.store.snapshot().await.deleting.is_empty());
    }

    #[tokio::test]
    async fn test_delete_in_flight_is_visible() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;
        f.dir
            .set_latency(Operation::Delete, Duration::from_millis(50))
            .await;

        let observe = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.store.snapshot().await
        };
        let (result, snap) = tokio::join!(f.store.delete("https://a.io"), observe);

        result.unwrap();
        assert_eq!(snap.deleting, vec!["https://a.io"]);
        assert!(snap.entries.iter().all(|v| v.entry.url != "https://a.io"));
    }

    #[tokio::test]
    async fn test_load_during_delete_does_not_resurrect() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;
        f.dir
            .set_latency(Operation::Delete, Duration::from_millis(50))
            .await;

        let reload = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.store.load().await
        };
        let (deleted, loaded) = tokio::join!(f.store.delete("https://a.io"), reload);

        deleted.unwrap();
        assert_eq!(loaded.unwrap(), 1);
        assert_eq!(urls(&f.store.entries().await), vec!["https://b.io"]);
    }

    // ==================== Click ====================

    #[tokio::test]
    async fn test_increment_click_stamps_time() {
        let f = signed_in(&["https://a.io"]).await;
        f.clock.advance(chrono::Duration::minutes(5));

        let entry = f.store.increment_click("https://a.io").await.unwrap();

        assert_eq!(entry.click_count, 1);
        assert_eq!(entry.last_clicked, Some(f.clock.now()));
        assert_eq!(f.store.entries().await[0], entry);

        let records = f.dir.records("alice").await;
        let server = &records[0];
        assert_eq!(server.click_count, 1);
        assert_eq!(server.last_clicked, entry.last_clicked);
    }

    #[tokio::test]
    async fn test_increment_click_failure_changes_nothing() {
        let f = signed_in(&["https://a.io"]).await;

        f.dir
            .fail_next(Operation::IncrementClick, RemoteError::Unavailable("down".into()))
            .await;
        assert!(f.store.increment_click("https://a.io").await.is_err());

        let entries = f.store.entries().await;
        let entry = &entries[0];
        assert_eq!(entry.click_count, 0);
        assert!(entry.last_clicked.is_none());
        assert!(f.store.snapshot().await.entries.iter().all(|v| !v.clicking));
    }

    #[tokio::test]
    async fn test_timeout_clears_busy_marker() {
        let f = fixture_with_timeout(Duration::from_millis(20));
        f.dir.seed("alice", seeded(&["https://a.io"])).await;
        f.store.sign_in(alice()).await.unwrap();
        f.dir
            .set_latency(Operation::IncrementClick, Duration::from_millis(500))
            .await;

        let err = f.store.increment_click("https://a.io").await.unwrap_err();

        assert_eq!(
            err,
            StoreError::RemoteUnavailable(RemoteError::Timeout(Duration::from_millis(20)))
        );
        let snap = f.store.snapshot().await;
        assert!(!snap.entries[0].clicking);
        assert_eq!(snap.entries[0].entry.click_count, 0);
    }

    // ==================== Rename ====================

    #[tokio::test]
    async fn test_rename_keeps_counters() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;
        f.store.increment_click("https://a.io").await.unwrap();

        let entry = f.store.rename("https://a.io", "z.io").await.unwrap();

        assert_eq!(entry.url, "https://z.io");
        assert_eq!(entry.click_count, 1);
        assert_eq!(server_urls(&f).await, vec!["https://b.io", "https://z.io"]);
        // Position is unchanged
        assert_eq!(
            urls(&f.store.entries().await),
            vec!["https://b.io", "https://z.io"]
        );
    }

    #[tokio::test]
    async fn test_rename_failure_keeps_original() {
        let f = signed_in(&["https://a.io"]).await;

        f.dir
            .fail_next(Operation::Rename, RemoteError::Rejected("no".into()))
            .await;
        assert!(f.store.rename("https://a.io", "z.io").await.is_err());

        assert_eq!(urls(&f.store.entries().await), vec!["https://a.io"]);
    }

    #[tokio::test]
    async fn test_rename_validation() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;

        let err = f.store.rename("https://a.io", "b.io").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateEntry { .. })
        ));

        let err = f.store.rename("https://a.io", "a.io").await.unwrap_err();
        assert_eq!(err, StoreError::Validation(ValidationError::Unchanged));

        assert_eq!(f.dir.call_count(Operation::Rename).await, 0);
    }

    #[tokio::test]
    async fn test_second_rename_while_in_flight() {
        let f = signed_in(&["https://a.io"]).await;
        f.dir
            .set_latency(Operation::Rename, Duration::from_millis(50))
            .await;

        let second = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.store.rename("https://a.io", "y.io").await
        };
        let (first, second) = tokio::join!(f.store.rename("https://a.io", "x.io"), second);

        assert_eq!(first.unwrap().url, "https://x.io");
        assert_eq!(
            second.unwrap_err(),
            StoreError::RenameInFlight {
                url: "https://a.io".into()
            }
        );
        assert_eq!(f.dir.call_count(Operation::Rename).await, 1);
    }

    // ==================== Edit mode ====================

    #[tokio::test]
    async fn test_leaving_edit_mode_flushes_changed_entries() {
        let f = signed_in(&["https://a.io", "https://b.io", "https://c.io"]).await;

        assert!(f.store.toggle_edit_mode().await.renamed.is_empty());
        assert!(f.store.snapshot().await.edit_mode);

        f.store.set_edit("https://a.io", "a2.io").await.unwrap();
        f.store.set_edit("https://b.io", "https://b.io").await.unwrap();
        f.store.set_edit("https://c.io", "b.io").await.unwrap();

        let flush = f.store.toggle_edit_mode().await;

        assert_eq!(
            flush.renamed,
            vec![("https://a.io".to_string(), "https://a2.io".to_string())]
        );
        assert_eq!(flush.failed.len(), 1);
        assert_eq!(flush.failed[0].0, "https://c.io");
        assert!(!f.store.snapshot().await.edit_mode);
        assert_eq!(f.dir.call_count(Operation::Rename).await, 1);
    }

    #[tokio::test]
    async fn test_edits_sharing_a_target_are_not_sent() {
        let f = signed_in(&["https://a.io", "https://b.io", "https://c.io"]).await;

        f.store.toggle_edit_mode().await;
        f.store.set_edit("https://a.io", "x.io").await.unwrap();
        f.store.set_edit("https://b.io", " https://x.io ").await.unwrap();
        f.store.set_edit("https://c.io", "y.io").await.unwrap();

        let flush = f.store.toggle_edit_mode().await;

        assert_eq!(
            flush.renamed,
            vec![("https://c.io".to_string(), "https://y.io".to_string())]
        );
        let mut failed: Vec<&str> = flush.failed.iter().map(|(url, _)| url.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["https://a.io", "https://b.io"]);
        for (_, e) in &flush.failed {
            assert_eq!(
                *e,
                StoreError::Validation(ValidationError::DuplicateEntry {
                    url: "https://x.io".into()
                })
            );
        }
        assert_eq!(f.dir.call_count(Operation::Rename).await, 1);
        assert_eq!(
            sorted_urls(&f.store.entries().await),
            vec!["https://a.io", "https://b.io", "https://y.io"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_renames_to_one_target() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;
        f.dir
            .set_latency(Operation::Rename, Duration::from_millis(30))
            .await;

        let (first, second) = tokio::join!(
            f.store.rename("https://a.io", "x.io"),
            f.store.rename("https://b.io", "x.io")
        );

        assert!(first.is_ok());
        assert!(matches!(
            second.unwrap_err(),
            StoreError::Validation(ValidationError::DuplicateEntry { .. })
        ));
        assert_eq!(f.dir.call_count(Operation::Rename).await, 1);
        assert_eq!(
            sorted_urls(&f.store.entries().await),
            vec!["https://b.io", "https://x.io"]
        );
    }

    #[tokio::test]
    async fn test_set_edit_requires_edit_mode() {
        let f = signed_in(&["https://a.io"]).await;
        assert_eq!(
            f.store.set_edit("https://a.io", "x.io").await.unwrap_err(),
            StoreError::NotEditing
        );
    }

    #[tokio::test]
    async fn test_commit_edit_on_focus_loss() {
        let f = signed_in(&["https://a.io"]).await;
        f.store.toggle_edit_mode().await;

        assert_eq!(f.store.begin_edit("https://a.io").await.unwrap(), "https://a.io");
        f.store.set_edit("https://a.io", "x.io").await.unwrap();
        assert_eq!(f.store.begin_edit("https://a.io").await.unwrap(), "x.io");
        assert_eq!(
            f.store.snapshot().await.entries[0].draft.as_deref(),
            Some("x.io")
        );

        let renamed = f.store.commit_edit("https://a.io").await.unwrap();
        assert_eq!(renamed.unwrap().url, "https://x.io");

        // Nothing buffered any more
        assert!(f.store.commit_edit("https://x.io").await.unwrap().is_none());
        assert!(f.store.snapshot().await.edit_mode);
    }

    // ==================== Stale results ====================

    #[tokio::test]
    async fn test_sign_out_discards_late_insert() {
        let f = signed_in(&["https://a.io"]).await;
        f.dir
            .set_latency(Operation::Insert, Duration::from_millis(50))
            .await;

        let sign_out = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.store.sign_out().await;
        };
        let (result, ()) = tokio::join!(f.store.insert("b.io"), sign_out);

        assert_eq!(result.unwrap_err(), StoreError::Stale);
        let snap = f.store.snapshot().await;
        assert!(snap.entries.is_empty());
        assert!(!snap.submitting);
    }

    #[tokio::test]
    async fn test_sign_out_skips_reload_after_failed_delete() {
        let f = signed_in(&["https://a.io"]).await;
        f.dir
            .set_latency(Operation::Delete, Duration::from_millis(50))
            .await;
        f.dir
            .fail_next(Operation::Delete, RemoteError::Unavailable("down".into()))
            .await;

        let sign_out = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.store.sign_out().await;
        };
        let (result, ()) = tokio::join!(f.store.delete("https://a.io"), sign_out);

        assert_eq!(result.unwrap_err(), StoreError::Stale);
        assert_eq!(f.dir.call_count(Operation::Load).await, 1);
        assert!(f.store.entries().await.is_empty());
    }

    // ==================== Ordering ====================

    #[tokio::test]
    async fn test_sort_toggles_direction() {
        let f = signed_in(&["https://b.io", "https://A.io", "https://c.io"]).await;

        f.store.sort(SortKey::Alphabetical).await;
        assert_eq!(
            urls(&f.store.entries().await),
            vec!["https://A.io", "https://b.io", "https://c.io"]
        );
        assert!(!f.store.snapshot().await.sort.alpha_ascending);

        f.store.sort(SortKey::Alphabetical).await;
        assert_eq!(
            urls(&f.store.entries().await),
            vec!["https://c.io", "https://b.io", "https://A.io"]
        );
    }

    #[tokio::test]
    async fn test_sort_by_clicks_most_first() {
        let f = signed_in(&["https://a.io", "https://b.io"]).await;
        f.store.increment_click("https://a.io").await.unwrap();

        f.store.sort(SortKey::ClickCount).await;

        assert_eq!(
            urls(&f.store.entries().await),
            vec!["https://a.io", "https://b.io"]
        );
        assert!(f.store.snapshot().await.sort.count_ascending);
    }

    #[tokio::test]
    async fn test_shuffle_keeps_entries() {
        let f = signed_in(&["https://a.io", "https://b.io", "https://c.io", "https://d.io"]).await;
        let before = sorted_urls(&f.store.entries().await);
        let flags = f.store.snapshot().await.sort;

        f.store.shuffle_with(&mut StdRng::seed_from_u64(7)).await;

        assert_eq!(sorted_urls(&f.store.entries().await), before);
        assert_eq!(f.store.snapshot().await.sort, flags);
        assert!(f.dir.calls().await.iter().all(|c| c.op == Operation::Load));
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let f = signed_in(&["https://a.io"]).await;
        let json = serde_json::to_value(f.store.snapshot().await).unwrap();

        assert_eq!(json["phase"], "ready");
        assert_eq!(json["principal"], "alice");
        assert_eq!(json["entries"][0]["url"], "https://a.io");
        assert_eq!(json["entries"][0]["renaming"], false);
    }
}
