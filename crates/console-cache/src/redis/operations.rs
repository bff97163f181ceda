//! Redis cache provider implementation.
//!
//! Uses only `GET`, `SET ... EX`, `DEL` and `SCAN` on the hot paths;
//! `TYPE`, `STRLEN` and `TTL` are issued by the inspection view.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use console_core::config::cache::MAX_TTL_SECONDS;
use console_core::error::{AppError, ErrorKind};
use console_core::result::AppResult;
use console_core::traits::cache::{CacheProvider, KeyMetadata};

use super::client::RedisClient;

/// Keys removed per `DEL` round trip during pattern deletes.
const DELETE_BATCH: usize = 500;

/// Redis-backed cache provider.
#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    /// Redis client.
    client: RedisClient,
}

impl RedisCacheProvider {
    /// Create a new Redis cache provider.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Cache, format!("Redis error: {e}"), e)
    }

    /// Enumerate prefixed keys matching an unprefixed pattern with `SCAN`.
    async fn scan_prefixed(&self, pattern: &str) -> AppResult<Vec<String>> {
        let full_pattern = self.client.prefixed_key(pattern);
        let mut conn = self.client.conn_mut();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&full_pattern)
                .arg("COUNT")
                .arg(self.client.scan_count())
                .query_async(&mut conn)
                .await
                .map_err(Self::map_err)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may yield a key more than once across iterations.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .set_ex(&full_key, value, ttl.as_secs().clamp(1, MAX_TTL_SECONDS))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<u64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let removed: u64 = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(removed)
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let keys = self.scan_prefixed(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.client.conn_mut();
        let mut count = 0u64;
        for chunk in keys.chunks(DELETE_BATCH) {
            let removed: u64 = conn.del(chunk.to_vec()).await.map_err(Self::map_err)?;
            count += removed;
        }

        debug!(pattern, count, "Deleted keys matching pattern");
        Ok(count)
    }

    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let keys = self.scan_prefixed(pattern).await?;
        Ok(keys
            .iter()
            .map(|k| self.client.unprefixed_key(k).to_string())
            .collect())
    }

    async fn describe(&self, key: &str) -> AppResult<Option<KeyMetadata>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        let key_type: String = redis::cmd("TYPE")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        if key_type == "none" {
            return Ok(None);
        }

        let size_bytes: u64 = if key_type == "string" {
            conn.strlen(&full_key).await.map_err(Self::map_err)?
        } else {
            0
        };

        // -2: key vanished since TYPE, -1: no expiry.
        let ttl: i64 = conn.ttl(&full_key).await.map_err(Self::map_err)?;
        let ttl_remaining = match ttl {
            -2 => return Ok(None),
            t if t < 0 => None,
            t => Some(t as u64),
        };

        Ok(Some(KeyMetadata {
            key_type,
            size_bytes,
            ttl_remaining,
        }))
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }

    async fn flush_all(&self) -> AppResult<u64> {
        // Only flush keys with our prefix, not the entire Redis.
        self.delete_pattern("*").await
    }
}
