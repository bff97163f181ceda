//! Cache manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use console_core::config::cache::{CacheConfig, CacheDuration, DurationTiers};
use console_core::error::AppError;
use console_core::result::AppResult;
use console_core::traits::cache::{CacheProvider, KeyMetadata};

use crate::memory::MemoryCacheProvider;

/// Cache manager that wraps the configured cache provider.
///
/// The provider is selected at construction time based on configuration.
/// A disabled manager holds no provider at all and behaves as a store
/// that is always empty and never fails.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// The inner cache provider, `None` when caching is disabled.
    inner: Option<Arc<dyn CacheProvider>>,
    /// TTL tier table.
    durations: DurationTiers,
    /// Tier used when a caller does not pick one.
    default_duration: CacheDuration,
    /// Whether concurrent misses share one computation.
    coalesce_misses: bool,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    ///
    /// When Redis is selected but unreachable and `fallback_to_memory` is
    /// set, the in-memory provider is used instead.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        config.validate()?;

        if !config.enabled {
            info!("Cache disabled by configuration");
            return Ok(Self::disabled(config));
        }

        let inner: Arc<dyn CacheProvider> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis cache provider");
                match crate::redis::RedisClient::connect(&config.redis).await {
                    Ok(client) => Arc::new(crate::redis::RedisCacheProvider::new(client)),
                    Err(e) if config.fallback_to_memory => {
                        warn!(error = %e, "Redis unreachable, falling back to in-memory cache");
                        Arc::new(MemoryCacheProvider::new(&config.memory))
                    }
                    Err(e) => return Err(e),
                }
            }
            "memory" => {
                info!("Initializing in-memory cache provider");
                Arc::new(MemoryCacheProvider::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self::with_settings(Some(inner), config))
    }

    /// A manager that caches nothing.
    pub fn disabled(config: &CacheConfig) -> Self {
        Self::with_settings(None, config)
    }

    /// Create a cache manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn CacheProvider>, config: &CacheConfig) -> Self {
        Self::with_settings(Some(provider), config)
    }

    fn with_settings(inner: Option<Arc<dyn CacheProvider>>, config: &CacheConfig) -> Self {
        Self {
            inner,
            durations: config.durations,
            default_duration: config.default_duration,
            coalesce_misses: config.coalesce_misses,
        }
    }

    /// Whether a store is active.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Get a reference to the inner provider.
    pub fn provider(&self) -> Option<&dyn CacheProvider> {
        self.inner.as_deref()
    }

    /// Resolve a duration tier to its configured TTL.
    pub fn ttl_for(&self, tier: CacheDuration) -> Duration {
        self.durations.resolve(tier)
    }

    /// Tier used when a caller does not pick one.
    pub fn default_duration(&self) -> CacheDuration {
        self.default_duration
    }

    /// Whether concurrent misses of one key should share a computation.
    pub fn coalesce_misses(&self) -> bool {
        self.coalesce_misses
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    fn name(&self) -> &'static str {
        self.inner.as_ref().map_or("disabled", |p| p.name())
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        match &self.inner {
            Some(inner) => inner.get(key).await,
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        match &self.inner {
            Some(inner) => inner.set(key, value, ttl).await,
            None => Ok(()),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<u64> {
        match &self.inner {
            Some(inner) => inner.delete(key).await,
            None => Ok(0),
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        match &self.inner {
            Some(inner) => inner.delete_pattern(pattern).await,
            None => Ok(0),
        }
    }

    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        match &self.inner {
            Some(inner) => inner.scan_keys(pattern).await,
            None => Ok(Vec::new()),
        }
    }

    async fn describe(&self, key: &str) -> AppResult<Option<KeyMetadata>> {
        match &self.inner {
            Some(inner) => inner.describe(key).await,
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        match &self.inner {
            Some(inner) => inner.health_check().await,
            None => Ok(true),
        }
    }

    async fn flush_all(&self) -> AppResult<u64> {
        match &self.inner {
            Some(inner) => inner.flush_all().await,
            None => Ok(0),
        }
    }
}
