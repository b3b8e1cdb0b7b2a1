//! In-process remote directory
//!
//! Behaves like an authoritative server: it keeps one collection per
//! principal and rejects requests that do not fit its current state.
//! Failures and latency can be scripted per operation.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::RemoteDirectory;
use crate::clock::{Clock, SystemClock};
use crate::error::{RemoteError, RemoteResult};
use crate::models::{Entry, Identity, RemoteRecord};
use crate::policy::Operation;

/// One call seen by the directory, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub op: Operation,
    pub principal: String,
    /// The URL argument; for renames, `old -> new`
    pub target: String,
}

#[derive(Debug, Clone)]
struct Fault {
    error: RemoteError,
    /// Apply the change before reporting the error (lost response)
    applied: bool,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, RemoteRecord>>,
    tokens: HashMap<String, String>,
    faults: HashMap<Operation, VecDeque<Fault>>,
    latency: HashMap<Operation, Duration>,
    calls: Vec<RemoteCall>,
}

/// In-memory [`RemoteDirectory`]
pub struct MemoryDirectory {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use a specific clock for server-side timestamps
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    /// Replace a principal's collection
    pub async fn seed(&self, principal: &str, entries: impl IntoIterator<Item = Entry>) {
        let records = entries
            .into_iter()
            .map(|e| (e.url.clone(), RemoteRecord::from(&e)))
            .collect();
        self.inner
            .lock()
            .await
            .collections
            .insert(principal.to_string(), records);
    }

    /// Require `token` for every call made as `principal`
    pub async fn authorize(&self, principal: &str, token: &str) {
        self.inner
            .lock()
            .await
            .tokens
            .insert(principal.to_string(), token.to_string());
    }

    /// Fail the next call of `op` without applying it
    pub async fn fail_next(&self, op: Operation, error: RemoteError) {
        self.push_fault(op, Fault { error, applied: false }).await;
    }

    /// Apply the next call of `op` but report `error` anyway
    pub async fn fail_next_after_apply(&self, op: Operation, error: RemoteError) {
        self.push_fault(op, Fault { error, applied: true }).await;
    }

    async fn push_fault(&self, op: Operation, fault: Fault) {
        self.inner
            .lock()
            .await
            .faults
            .entry(op)
            .or_default()
            .push_back(fault);
    }

    /// Delay every call of `op`
    pub async fn set_latency(&self, op: Operation, latency: Duration) {
        self.inner.lock().await.latency.insert(op, latency);
    }

    /// Every call received so far
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Number of calls received for `op`
    pub async fn call_count(&self, op: Operation) -> usize {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    /// Server-side view of a principal's collection, ordered by URL
    pub async fn records(&self, principal: &str) -> Vec<RemoteRecord> {
        self.inner
            .lock()
            .await
            .collections
            .get(principal)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Log the call, wait out any latency, check auth, and pop a fault
    async fn begin(&self, op: Operation, identity: &Identity, target: String) -> RemoteResult<Option<Fault>> {
        let latency = {
            let mut inner = self.inner.lock().await;
            inner.calls.push(RemoteCall {
                op,
                principal: identity.principal.clone(),
                target,
            });
            inner.latency.get(&op).copied()
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.inner.lock().await;
        if let Some(expected) = inner.tokens.get(&identity.principal) {
            if expected != identity.token() {
                return Err(RemoteError::Unavailable("unauthorized".to_string()));
            }
        }

        Ok(inner.faults.get_mut(&op).and_then(|q| q.pop_front()))
    }

    /// Run a mutation against the principal's collection, honoring a fault
    async fn mutate<F>(&self, op: Operation, identity: &Identity, target: String, apply: F) -> RemoteResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, RemoteRecord>) -> RemoteResult<()> + Send,
    {
        let fault = self.begin(op, identity, target).await?;

        if let Some(fault) = fault.as_ref().filter(|f| !f.applied) {
            debug!(%op, "memory directory: injected failure");
            return Err(fault.error.clone());
        }

        let mut inner = self.inner.lock().await;
        let collection = inner
            .collections
            .entry(identity.principal.clone())
            .or_default();
        apply(collection)?;

        match fault {
            Some(Fault { error, .. }) => {
                debug!(%op, "memory directory: applied, then injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteDirectory for MemoryDirectory {
    async fn list(&self, identity: &Identity) -> RemoteResult<Vec<RemoteRecord>> {
        if let Some(fault) = self.begin(Operation::Load, identity, String::new()).await? {
            return Err(fault.error);
        }
        Ok(self.records(&identity.principal).await)
    }

    async fn insert(&self, identity: &Identity, url: &str) -> RemoteResult<()> {
        let now = self.clock.now();
        let url = url.to_string();
        self.mutate(Operation::Insert, identity, url.clone(), move |c| {
            if c.contains_key(&url) {
                return Err(RemoteError::Rejected(format!("'{}' already exists", url)));
            }
            let record = RemoteRecord::from(&Entry::new(url.clone(), now));
            c.insert(url, record);
            Ok(())
        })
        .await
    }

    async fn delete(&self, identity: &Identity, url: &str) -> RemoteResult<()> {
        let url = url.to_string();
        self.mutate(Operation::Delete, identity, url.clone(), move |c| {
            c.remove(&url)
                .map(|_| ())
                .ok_or_else(|| RemoteError::Rejected(format!("'{}' not found", url)))
        })
        .await
    }

    async fn rename(&self, identity: &Identity, old_url: &str, new_url: &str) -> RemoteResult<()> {
        let (old_url, new_url) = (old_url.to_string(), new_url.to_string());
        let target = format!("{} -> {}", old_url, new_url);
        self.mutate(Operation::Rename, identity, target, move |c| {
            if c.contains_key(&new_url) {
                return Err(RemoteError::Rejected(format!("'{}' already exists", new_url)));
            }
            let mut record = c
                .remove(&old_url)
                .ok_or_else(|| RemoteError::Rejected(format!("'{}' not found", old_url)))?;
            record.url = new_url.clone();
            c.insert(new_url, record);
            Ok(())
        })
        .await
    }

    async fn increment_click(&self, identity: &Identity, url: &str) -> RemoteResult<()> {
        let now = self.clock.now();
        let url = url.to_string();
        self.mutate(Operation::IncrementClick, identity, url.clone(), move |c| {
            let record = c
                .get_mut(&url)
                .ok_or_else(|| RemoteError::Rejected(format!("'{}' not found", url)))?;
            record.click_count += 1;
            record.last_clicked = Some(now);
            Ok(())
        })
        .await
    }
}
