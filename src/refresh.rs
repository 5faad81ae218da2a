//! Time-to-live snapshot cache with single-flight refresh.
//!
//! A [`Refresher`] holds at most one snapshot of a resource (spot or perp
//! balances) together with the account it belongs to and when it was
//! fetched. Callers that want a refresh queue on one async gate in FIFO
//! order, so at most one backend call per resource is in flight. Whoever
//! acquires the gate next re-checks freshness first, which coalesces a
//! burst of identical requests into a single fetch.
//!
//! The snapshot itself sits behind a short synchronous lock that is never
//! held across an `.await`, so readers never observe a half-written value.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::Result;

/// The cached value plus its provenance.
struct Snapshot<T> {
    value: Arc<T>,
    owner: String,
    fetched_at: Instant,
}

/// Single-flight TTL cache for one resource of one user.
pub(crate) struct Refresher<T> {
    resource: &'static str,
    timeout: Duration,
    gate: Mutex<()>,
    slot: RwLock<Option<Snapshot<T>>>,
}

impl<T> Refresher<T> {
    /// Creates an empty cache. Each fetch is bounded by `timeout`.
    pub(crate) fn new(resource: &'static str, timeout: Duration) -> Self {
        Self {
            resource,
            timeout,
            gate: Mutex::new(()),
            slot: RwLock::new(None),
        }
    }

    /// Returns the cached value for `owner` if it is younger than `max_age`.
    pub(crate) fn fresh(&self, owner: &str, max_age: Duration) -> Option<Arc<T>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|s| s.owner == owner && s.fetched_at.elapsed() < max_age)
            .map(|s| Arc::clone(&s.value))
    }

    /// Returns the cached value for `owner` regardless of age.
    pub(crate) fn cached_for(&self, owner: &str) -> Option<Arc<T>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|s| s.owner == owner)
            .map(|s| Arc::clone(&s.value))
    }

    /// Returns whatever is cached, for any account.
    pub(crate) fn cached(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|s| Arc::clone(&s.value))
    }

    /// When the current snapshot was fetched.
    pub(crate) fn last_refreshed(&self) -> Option<Instant> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|s| s.fetched_at)
    }

    /// Replaces the snapshot wholesale and returns the shared handle.
    pub(crate) fn store(&self, owner: &str, value: T, fetched_at: Instant) -> Arc<T> {
        let value = Arc::new(value);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Snapshot {
            value: Arc::clone(&value),
            owner: owner.to_string(),
            fetched_at,
        });
        value
    }

    /// Returns a fresh snapshot for `owner`, fetching it if needed.
    ///
    /// With `force`, `fetch` always runs. Otherwise it runs only when there
    /// is no snapshot for `owner` or the snapshot is at least `max_age` old.
    /// On failure or timeout the previous snapshot and timestamp are kept.
    pub(crate) async fn refresh<F, Fut>(
        &self,
        owner: &str,
        force: bool,
        max_age: Duration,
        fetch: F,
    ) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _gate = self.gate.lock().await;

        if !force && let Some(value) = self.fresh(owner, max_age) {
            debug!(resource = self.resource, owner, "cache hit");
            return Ok(value);
        }

        debug!(resource = self.resource, owner, force, "fetching");
        let started = Instant::now();
        let value = bounded(self.resource, self.timeout, fetch()).await?;
        Ok(self.store(owner, value, started))
    }
}

/// Runs `fut`, failing with `RefreshTimedOut` if it takes longer than `after`.
pub(crate) async fn bounded<T, Fut>(resource: &'static str, after: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| crate::AccountsError::RefreshTimedOut { resource, after })?
}
