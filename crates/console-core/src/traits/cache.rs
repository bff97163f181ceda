//! Cache store trait for pluggable caching backends.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::result::AppResult;

/// Live metadata of a stored key, used by the inspection view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyMetadata {
    /// Backend value type (`"string"` for everything this layer writes).
    pub key_type: String,
    /// Approximate payload size in bytes.
    pub size_bytes: u64,
    /// Seconds until expiry, `None` when the key has no TTL.
    pub ttl_remaining: Option<u64>,
}

/// Trait for cache backends (Redis or in-memory).
///
/// All values are serialized as strings (JSON). The cache provider
/// is responsible for key prefixing and TTL enforcement. Keys and
/// patterns passed in and returned are always unprefixed.
///
/// Patterns use the Redis glob subset: `*` matches any run of
/// characters and `?` matches exactly one.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Short backend name for logs and status output.
    fn name(&self) -> &'static str;

    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL, overwriting any existing entry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Delete a key from the cache. Returns the number of keys removed (0 or 1).
    async fn delete(&self, key: &str) -> AppResult<u64>;

    /// Delete all keys matching a pattern (e.g., `"users-list:*"`).
    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64>;

    /// List live keys matching a pattern.
    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>>;

    /// Type, size and remaining TTL of a live key.
    async fn describe(&self, key: &str) -> AppResult<Option<KeyMetadata>>;

    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key).await? {
            Some(value) => {
                let parsed = serde_json::from_str(&value)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl).await
    }

    /// Check that the cache backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Flush every entry owned by this cache. Returns the number removed.
    async fn flush_all(&self) -> AppResult<u64>;
}
