//! Operator view over live cache keys.
//!
//! Keys are classified as private when their family is principal-scoped
//! and the key carries an id, and as public otherwise. The classification
//! only drives filtering in the operations UI; it is not access control.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use console_core::result::AppResult;
use console_core::traits::cache::CacheProvider;

use crate::invalidation::CacheInvalidator;
use crate::keys::{CacheKeyPattern, KeyScope, parse_key};
use crate::provider::CacheManager;

/// Ownership of a live key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "privacy", content = "owner", rename_all = "lowercase")]
pub enum Privacy {
    /// Shared by every principal.
    Public,
    /// Scoped to the principal with this id.
    Private(String),
}

impl Privacy {
    /// Whether a principal may see this key in a filtered listing.
    pub fn visible_to(&self, principal: &str) -> bool {
        match self {
            Self::Public => true,
            Self::Private(owner) => owner == principal,
        }
    }

    /// Short label for tables.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private(_) => "private",
        }
    }

    /// Owning principal, if any.
    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::Public => None,
            Self::Private(owner) => Some(owner),
        }
    }
}

/// Classify a raw key. Keys outside the registry are public.
pub fn classify(key: &str) -> Privacy {
    match parse_key(key) {
        Some(parsed) if parsed.family.scope() == KeyScope::Principal => match parsed.id {
            Some(owner) => Privacy::Private(owner),
            None => Privacy::Public,
        },
        _ => Privacy::Public,
    }
}

/// One row of the inspection listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    /// Key without backend prefix.
    pub key: String,
    /// Backend value type.
    #[serde(rename = "type")]
    pub key_type: String,
    /// Approximate payload size in bytes.
    pub size_estimate: u64,
    /// Seconds until expiry.
    pub ttl_remaining: Option<u64>,
    /// Ownership classification.
    #[serde(flatten)]
    pub privacy: Privacy,
}

/// Summary shown at the top of the operations page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    /// Active backend (`redis`, `memory` or `disabled`).
    pub backend: String,
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Whether the backend answered its health check.
    pub healthy: bool,
    /// Live keys.
    pub total_keys: usize,
    /// Live public keys.
    pub public_keys: usize,
    /// Live private keys.
    pub private_keys: usize,
}

/// Lists, classifies and deletes live keys.
#[derive(Debug, Clone)]
pub struct CacheInspector {
    cache: Arc<CacheManager>,
    invalidator: CacheInvalidator,
}

impl CacheInspector {
    /// Create an inspector; deletions go through `invalidator`.
    pub fn new(cache: Arc<CacheManager>, invalidator: CacheInvalidator) -> Self {
        Self { cache, invalidator }
    }

    /// List live keys. With `filter_to_principal`, only public keys and
    /// keys private to that principal are returned.
    pub async fn list_keys(&self, filter_to_principal: Option<&str>) -> AppResult<Vec<KeyInfo>> {
        let keys = self
            .cache
            .scan_keys(CacheKeyPattern::everything().as_str())
            .await?;

        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            let privacy = classify(&key);
            if let Some(principal) = filter_to_principal {
                if !privacy.visible_to(principal) {
                    continue;
                }
            }

            // The key may have expired or been deleted since the scan.
            let Some(meta) = self.cache.describe(&key).await? else {
                continue;
            };

            rows.push(KeyInfo {
                key,
                key_type: meta.key_type,
                size_estimate: meta.size_bytes,
                ttl_remaining: meta.ttl_remaining,
                privacy,
            });
        }

        rows.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(count = rows.len(), filtered = filter_to_principal.is_some(), "Listed cache keys");
        Ok(rows)
    }

    /// Delete one key from the view.
    pub async fn delete_key(&self, key: &str) -> u64 {
        self.invalidator.delete_raw(key).await
    }

    /// Delete every key private to `principal`.
    pub async fn delete_private_keys(&self, principal: &str) -> u64 {
        let keys = match self.list_keys(Some(principal)).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(principal, error = %e, "Could not list keys for deletion");
                return 0;
            }
        };

        let mut total = 0;
        for info in keys.iter().filter(|k| k.privacy.owner() == Some(principal)) {
            total += self.invalidator.delete_raw(&info.key).await;
        }
        total
    }

    /// Remove every entry owned by the cache.
    pub async fn flush_all(&self) -> u64 {
        self.invalidator.flush_all().await
    }

    /// Backend, health and key counts.
    pub async fn status(&self) -> AppResult<CacheStatus> {
        let healthy = self.cache.health_check().await.unwrap_or(false);
        let keys = if healthy {
            self.cache
                .scan_keys(CacheKeyPattern::everything().as_str())
                .await?
        } else {
            Vec::new()
        };
        let private_keys = keys
            .iter()
            .filter(|k| matches!(classify(k), Privacy::Private(_)))
            .count();

        Ok(CacheStatus {
            backend: self.cache.name().to_string(),
            enabled: self.cache.is_enabled(),
            healthy,
            total_keys: keys.len(),
            public_keys: keys.len() - private_keys,
            private_keys,
        })
    }
}
