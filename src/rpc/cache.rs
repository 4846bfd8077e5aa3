//! Response cache keyed by (method, canonical parameters).
//!
//! Entries carry their own TTL so high-frequency data (slot, vote
//! accounts) and epoch-long data (leader schedule) share one cache.
//! Failed fetches are never stored, and concurrent requests for the same
//! key await a single in-flight fetch instead of issuing duplicates.

use crate::rpc::error::QueryError;
use crate::rpc::methods::Method;
use moka::future::Cache;
use moka::Expiry;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache key: method plus canonicalized parameters.
///
/// `serde_json` keeps object keys sorted, so serializing the params value
/// yields a stable string for equal parameter sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    method: Method,
    params: String,
}

impl QueryKey {
    pub fn new(method: Method, params: &Value) -> Self {
        Self { method, params: params.to_string() }
    }
}

#[derive(Clone)]
struct CachedValue {
    value: Arc<Value>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<QueryKey, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &QueryKey,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Async cache shielding the transport from redundant calls.
pub struct QueryCache {
    inner: Cache<QueryKey, CachedValue>,
}

impl QueryCache {
    /// Create a cache bounded to `max_entries`.
    pub fn new(max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }

    /// Return the cached value for `key` if unexpired, otherwise run
    /// `fetch`, store its success under `key` with the given TTL, and
    /// return it. Errors propagate without being cached, so the next call
    /// retries.
    pub async fn get_or_fetch(
        &self,
        key: QueryKey,
        ttl: Duration,
        fetch: impl Future<Output = Result<Value, QueryError>>,
    ) -> Result<Arc<Value>, QueryError> {
        let entry = self
            .inner
            .try_get_with(key.clone(), async move {
                debug!(method = key.method.rpc_name(), "cache miss, fetching");
                fetch.await.map(|value| CachedValue { value: Arc::new(value), ttl })
            })
            .await
            .map_err(|e: Arc<QueryError>| (*e).clone())?;
        Ok(entry.value)
    }

    /// Number of live entries (approximate, for diagnostics).
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}
