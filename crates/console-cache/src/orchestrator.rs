//! Read-through and forced-refresh entry points used by every fetcher.
//!
//! The store is an optimization, never a source of truth: any store
//! failure degrades to a miss and the caller still gets a freshly
//! computed value. Errors from the compute function are returned to the
//! caller unchanged and nothing is cached for them.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use console_core::config::cache::CacheDuration;
use console_core::result::AppResult;
use console_core::traits::cache::CacheProvider;

use crate::keys::CacheKey;
use crate::provider::CacheManager;

/// Where and for how long a computed value is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Key the value is stored under.
    pub key: CacheKey,
    /// TTL tier.
    pub duration: CacheDuration,
}

impl CacheOptions {
    /// Options for a key and tier.
    pub fn new(key: CacheKey, duration: CacheDuration) -> Self {
        Self { key, duration }
    }
}

/// Read-through cache orchestrator.
#[derive(Debug, Clone)]
pub struct CacheOrchestrator {
    cache: Arc<CacheManager>,
    /// Per-key locks for in-flight misses, present when coalescing is on.
    in_flight: Option<Arc<DashMap<String, Arc<Mutex<()>>>>>,
}

impl CacheOrchestrator {
    /// Create an orchestrator over a cache manager.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        let in_flight = cache.coalesce_misses().then(|| Arc::new(DashMap::new()));
        Self { cache, in_flight }
    }

    /// Options for `key` with the configured default tier.
    pub fn options(&self, key: CacheKey) -> CacheOptions {
        CacheOptions::new(key, self.cache.default_duration())
    }

    /// Return the cached value for `options.key`, or compute, store and
    /// return it on a miss.
    pub async fn with_cache<T, E, F, Fut>(&self, options: &CacheOptions, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.cache.is_enabled() {
            return compute().await;
        }

        if let Some(hit) = self.lookup(&options.key).await {
            return Ok(hit);
        }

        let Some(in_flight) = &self.in_flight else {
            return self.compute_and_store(options, compute).await;
        };

        let slot = InFlightSlot::acquire(in_flight, options.key.as_str());
        let _guard = slot.lock.lock().await;
        // Another caller may have filled the key while we waited.
        match self.lookup(&options.key).await {
            Some(hit) => Ok(hit),
            None => self.compute_and_store(options, compute).await,
        }
    }

    /// Always compute, overwrite `options.key` with the result and return it.
    pub async fn re_cache<T, E, F, Fut>(&self, options: &CacheOptions, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.cache.is_enabled() {
            return compute().await;
        }

        debug!(key = %options.key, "Forced cache refresh");
        self.compute_and_store(options, compute).await
    }

    /// [`with_cache`](Self::with_cache) or [`re_cache`](Self::re_cache)
    /// depending on a caller-supplied refresh flag.
    pub async fn fetch<T, E, F, Fut>(
        &self,
        options: &CacheOptions,
        force_refresh: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if force_refresh {
            self.re_cache(options, compute).await
        } else {
            self.with_cache(options, compute).await
        }
    }

    async fn compute_and_store<T, E, F, Fut>(&self, options: &CacheOptions, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = compute().await?;
        self.store(options, &value).await;
        Ok(value)
    }

    async fn lookup<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let cached: AppResult<Option<T>> = self.cache.get_json(key.as_str()).await;
        match cached {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                None
            }
            Err(e) if e.is_store_failure() => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value could not be decoded, recomputing");
                None
            }
        }
    }

    async fn store<T>(&self, options: &CacheOptions, value: &T)
    where
        T: Serialize + Send + Sync,
    {
        let ttl = self.cache.ttl_for(options.duration);
        match self.cache.set_json(options.key.as_str(), value, ttl).await {
            Ok(()) => debug!(
                key = %options.key,
                duration = %options.duration,
                ttl_secs = ttl.as_secs(),
                "Cached value"
            ),
            Err(e) => warn!(key = %options.key, error = %e, "Cache write failed"),
        }
    }
}

/// A caller's share of a per-key in-flight lock.
///
/// Dropping the last share removes the key from the map, also when the
/// caller's future is cancelled while waiting or computing.
struct InFlightSlot<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> InFlightSlot<'a> {
    fn acquire(map: &'a DashMap<String, Arc<Mutex<()>>>, key: &'a str) -> Self {
        let lock = map.entry(key.to_string()).or_default().clone();
        Self { map, key, lock }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        // Held by the map and by us only.
        self.map.remove_if(self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}
