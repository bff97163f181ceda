//! In-process cache store with per-entry TTL bookkeeping.
//!
//! Entries expire lazily on read and are also swept periodically by an
//! optional background task. Time is read through `tokio::time::Instant`
//! so a paused test clock drives expiry.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use console_core::config::cache::{MAX_TTL_SECONDS, MemoryCacheConfig};
use console_core::result::AppResult;
use console_core::traits::cache::{CacheProvider, KeyMetadata};

use crate::pattern::glob_match;

/// A stored value with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized payload.
    pub value: String,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
    /// Monotonic expiry deadline.
    pub expires_at: Instant,
}

impl CacheEntry {
    /// TTLs above [`MAX_TTL_SECONDS`] are clamped so the deadline never
    /// overflows the clock.
    fn new(value: &str, ttl: Duration) -> Self {
        let ttl = ttl.min(Duration::from_secs(MAX_TTL_SECONDS));
        Self {
            value: value.to_string(),
            created_at: Utc::now(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

type Entries = DashMap<String, CacheEntry>;

/// In-memory cache provider.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// Live entries keyed by cache key.
    entries: Arc<Entries>,
    /// Upper bound on stored entries; `0` means unbounded.
    max_capacity: u64,
    /// Background expiry sweep, aborted when the last clone is dropped.
    sweeper: Option<Arc<Sweeper>>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    ///
    /// The background sweep only starts when called inside a Tokio runtime.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let entries = Arc::new(DashMap::new());
        let sweeper = match (
            config.sweep_interval_seconds,
            tokio::runtime::Handle::try_current(),
        ) {
            (0, _) | (_, Err(_)) => None,
            (secs, Ok(handle)) => Some(Arc::new(Sweeper::spawn(
                &handle,
                Arc::downgrade(&entries),
                Duration::from_secs(secs),
            ))),
        };

        Self {
            entries,
            max_capacity: config.max_capacity,
            sweeper,
        }
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Number of entries currently held, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a background sweep task is running.
    pub fn has_sweeper(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Make room for one more entry when the store is full.
    ///
    /// The bound is soft: concurrent `set`s may each pass the check before
    /// inserting and briefly overshoot it. The next `set` of a new key
    /// evicts until the store is back under the bound.
    fn ensure_capacity(&self, incoming: &str) {
        if self.max_capacity == 0 || self.entries.contains_key(incoming) {
            return;
        }

        let mut purged = false;
        while (self.entries.len() as u64) >= self.max_capacity {
            if !purged {
                purged = true;
                if purge(&self.entries) > 0 {
                    continue;
                }
            }

            // Still full: evict the entry closest to expiry.
            let victim = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());

            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                    debug!(key, "Evicted cache entry at capacity");
                }
                None => break,
            }
        }
    }

    fn live_keys(&self, pattern: &str, now: Instant) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now) && glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.ensure_capacity(key);
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<u64> {
        let now = Instant::now();
        let removed = self.entries.remove(key);
        Ok(match removed {
            Some((_, entry)) if !entry.is_expired(now) => 1,
            _ => 0,
        })
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let now = Instant::now();
        let mut count = 0u64;

        // Collect first; removing while iterating a DashMap shard deadlocks.
        for key in self.live_keys(pattern, now) {
            if self.entries.remove(&key).is_some() {
                count += 1;
            }
        }

        debug!(pattern, count, "Deleted keys matching pattern");
        Ok(count)
    }

    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let mut keys = self.live_keys(pattern, Instant::now());
        keys.sort();
        Ok(keys)
    }

    async fn describe(&self, key: &str) -> AppResult<Option<KeyMetadata>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| KeyMetadata {
                key_type: "string".to_string(),
                size_bytes: entry.value.len() as u64,
                ttl_remaining: Some(entry.remaining(now).as_secs_f64().ceil() as u64),
            }))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<u64> {
        let now = Instant::now();
        let live = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count() as u64;
        self.entries.clear();
        Ok(live)
    }
}

fn purge(entries: &Entries) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(entries.len())
}

/// Handle to the periodic expiry task.
#[derive(Debug)]
struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    fn spawn(handle: &tokio::runtime::Handle, entries: Weak<Entries>, every: Duration) -> Self {
        let handle = handle.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                let purged = purge(&entries);
                if purged > 0 {
                    debug!(purged, "Swept expired cache entries");
                }
            }
        });
        Self { handle }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
