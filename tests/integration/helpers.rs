//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use console_cache::{CacheLayer, CacheManager, CacheOptions, CacheParams, KeyFamily};
use console_core::config::AppConfig;
use console_core::config::cache::CacheDuration;
use console_core::error::AppError;
use console_core::result::AppResult;
use console_core::traits::cache::{CacheProvider, KeyMetadata};

/// Cache layer built from the test fixture configuration.
pub struct TestCache {
    /// The wired cache layer
    pub layer: CacheLayer,
    /// Application config
    pub config: AppConfig,
}

impl TestCache {
    /// Memory-backed layer from `tests/fixtures/test_config.toml`.
    pub async fn new() -> Self {
        let config = load_config();
        let layer = CacheLayer::new(&config.cache)
            .await
            .expect("Failed to init cache");
        Self { layer, config }
    }

    /// Layer with caching switched off.
    pub async fn disabled() -> Self {
        let mut config = load_config();
        config.cache.enabled = false;
        let layer = CacheLayer::new(&config.cache)
            .await
            .expect("Failed to init cache");
        Self { layer, config }
    }

    /// Layer whose store rejects every operation.
    pub fn failing() -> Self {
        let config = load_config();
        let manager = CacheManager::from_provider(Arc::new(FailingProvider), &config.cache);
        Self {
            layer: CacheLayer::from_manager(Arc::new(manager)),
            config,
        }
    }

    /// Store a JSON payload directly, bypassing the orchestrator.
    pub async fn seed(&self, key: &console_cache::CacheKey) {
        self.layer
            .manager
            .set(key.as_str(), "{\"seeded\":true}", Duration::from_secs(60))
            .await
            .expect("Failed to seed cache");
    }

    /// Whether a key is currently stored.
    pub async fn contains(&self, key: &console_cache::CacheKey) -> bool {
        self.layer
            .manager
            .get(key.as_str())
            .await
            .expect("Failed to read cache")
            .is_some()
    }
}

fn load_config() -> AppConfig {
    AppConfig::load("tests/fixtures/test_config.toml", "test").expect("Failed to load test config")
}

/// Options for one page of the user listing, cached in the short tier.
pub fn users_page(page: u32, limit: u32) -> CacheOptions {
    let params = CacheParams::new().with("page", page).with("limit", limit);
    CacheOptions::new(KeyFamily::USERS_LIST.key(None, &params), CacheDuration::Short)
}

/// User row as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: String,
    /// Display name
    pub name: String,
}

/// In-process stand-in for the user table that counts queries.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: Mutex<Vec<User>>,
    queries: AtomicUsize,
}

impl UserDirectory {
    /// Directory pre-populated with `names`, ids assigned from 1.
    pub fn with_users(names: &[&str]) -> Self {
        let directory = Self::default();
        for name in names {
            directory.create(name);
        }
        directory
    }

    /// Insert a user and return its id.
    pub fn create(&self, name: &str) -> String {
        let mut users = self.users.lock().expect("directory lock poisoned");
        let id = (users.len() + 1).to_string();
        users.push(User {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// One page of users.
    pub async fn list(&self, page: u32, limit: u32) -> Result<Vec<User>, String> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let users = self.users.lock().expect("directory lock poisoned");
        let skip = (page.saturating_sub(1) * limit) as usize;
        Ok(users.iter().skip(skip).take(limit as usize).cloned().collect())
    }

    /// Number of list queries served.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

/// Store that fails every operation, standing in for an unreachable backend.
#[derive(Debug)]
pub struct FailingProvider;

impl FailingProvider {
    fn unavailable<T>() -> AppResult<T> {
        Err(AppError::cache("store unavailable"))
    }
}

#[async_trait]
impl CacheProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Self::unavailable()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Self::unavailable()
    }

    async fn delete(&self, _key: &str) -> AppResult<u64> {
        Self::unavailable()
    }

    async fn delete_pattern(&self, _pattern: &str) -> AppResult<u64> {
        Self::unavailable()
    }

    async fn scan_keys(&self, _pattern: &str) -> AppResult<Vec<String>> {
        Self::unavailable()
    }

    async fn describe(&self, _key: &str) -> AppResult<Option<KeyMetadata>> {
        Self::unavailable()
    }

    async fn health_check(&self) -> AppResult<bool> {
        Self::unavailable()
    }

    async fn flush_all(&self) -> AppResult<u64> {
        Self::unavailable()
    }
}
