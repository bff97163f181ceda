//! # console-cache
//!
//! Cache orchestration layer for the admin console:
//!
//! - **keys**: deterministic keys and sweep patterns per resource family
//! - **memory** / **redis**: the two interchangeable stores
//! - **provider**: [`CacheManager`], which picks the store at startup
//! - **orchestrator**: `with_cache` (read-through) and `re_cache` (forced refresh)
//! - **invalidation**: per-family invalidation after mutations
//! - **inspect**: operator listing with public/private classification
//!
//! Build everything at once with [`CacheLayer::new`] and hand the pieces
//! to fetchers and route handlers.

pub mod inspect;
pub mod invalidation;
pub mod keys;
pub mod memory;
pub mod orchestrator;
pub mod pattern;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

use std::sync::Arc;

use console_core::config::cache::CacheConfig;
use console_core::result::AppResult;

pub use inspect::{CacheInspector, KeyInfo, Privacy};
pub use invalidation::CacheInvalidator;
pub use keys::{CacheKey, CacheKeyPattern, CacheParams, KeyFamily};
pub use orchestrator::{CacheOptions, CacheOrchestrator};
pub use provider::CacheManager;

/// The cache subsystem wired around one shared [`CacheManager`].
#[derive(Debug, Clone)]
pub struct CacheLayer {
    /// Shared store handle.
    pub manager: Arc<CacheManager>,
    /// Read-through / refresh entry points.
    pub orchestrator: CacheOrchestrator,
    /// Mutation-driven invalidation.
    pub invalidator: CacheInvalidator,
    /// Operator inspection.
    pub inspector: CacheInspector,
}

impl CacheLayer {
    /// Build the store from configuration and wire every component to it.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let manager = CacheManager::new(config).await?;
        Ok(Self::from_manager(Arc::new(manager)))
    }

    /// Wire every component to an existing manager.
    pub fn from_manager(manager: Arc<CacheManager>) -> Self {
        let invalidator = CacheInvalidator::new(manager.clone());
        Self {
            orchestrator: CacheOrchestrator::new(manager.clone()),
            inspector: CacheInspector::new(manager.clone(), invalidator.clone()),
            invalidator,
            manager,
        }
    }
}
