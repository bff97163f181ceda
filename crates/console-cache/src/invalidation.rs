//! Invalidation of cached views after mutations, grouped by resource family.
//!
//! Every function here is infallible from the caller's point of view:
//! store errors are logged and swallowed, since every entry still expires
//! through its TTL. When caching is disabled every function returns 0
//! without touching the store. Return values are the number of keys
//! actually removed.

use std::sync::Arc;

use tracing::{debug, warn};

use console_core::traits::cache::CacheProvider;

use crate::keys::{CacheKey, CacheKeyPattern, KeyFamily};
use crate::provider::CacheManager;

/// Deletes single keys or pattern sweeps through the shared cache manager.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    cache: Arc<CacheManager>,
}

impl CacheInvalidator {
    /// Create an invalidator over a cache manager.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    // ── Primitives ─────────────────────────────────────────

    /// Delete one key.
    pub async fn invalidate_key(&self, key: &CacheKey) -> u64 {
        self.delete_raw(key.as_str()).await
    }

    /// Delete every key matching a pattern.
    pub async fn invalidate_by_pattern(&self, pattern: &CacheKeyPattern) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        match self.cache.delete_pattern(pattern.as_str()).await {
            Ok(count) => {
                debug!(pattern = %pattern, count, "Invalidated cache pattern");
                count
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache pattern invalidation failed");
                0
            }
        }
    }

    /// Delete a key given as a raw string, e.g. from the inspection view.
    pub async fn delete_raw(&self, key: &str) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        match self.cache.delete(key).await {
            Ok(count) => {
                debug!(key, count, "Invalidated cache key");
                count
            }
            Err(e) => {
                warn!(key, error = %e, "Cache key invalidation failed");
                0
            }
        }
    }

    /// Remove every entry owned by this cache.
    pub async fn flush_all(&self) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        match self.cache.flush_all().await {
            Ok(count) => {
                debug!(count, "Flushed cache");
                count
            }
            Err(e) => {
                warn!(error = %e, "Cache flush failed");
                0
            }
        }
    }

    async fn sweep(&self, patterns: &[CacheKeyPattern]) -> u64 {
        let mut total = 0;
        for pattern in patterns {
            total += self.invalidate_by_pattern(pattern).await;
        }
        total
    }

    // ── Users ──────────────────────────────────────────────

    /// A user was created, updated or deleted.
    pub async fn invalidate_user_cache(&self, user_id: &str) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.sweep(&[
            KeyFamily::USER.scoped_pattern(user_id),
            KeyFamily::PROFILE.scoped_pattern(user_id),
            KeyFamily::USERS_LIST.list_pattern(),
            KeyFamily::DASHBOARD.list_pattern(),
        ])
        .await
    }

    /// Every paginated or filtered user listing.
    pub async fn invalidate_users_list_cache(&self) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.invalidate_by_pattern(&KeyFamily::USERS_LIST.list_pattern())
            .await
    }

    /// Effective permissions of one user.
    pub async fn invalidate_user_permissions_cache(&self, user_id: &str) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.invalidate_by_pattern(&KeyFamily::USER_PERMISSIONS.scoped_pattern(user_id))
            .await
    }

    /// Group memberships of one user.
    pub async fn invalidate_user_groups_cache(&self, user_id: &str) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.invalidate_by_pattern(&KeyFamily::USER_GROUPS.scoped_pattern(user_id))
            .await
    }

    /// Profile settings of one user.
    pub async fn invalidate_profile_cache(&self, user_id: &str) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.invalidate_by_pattern(&KeyFamily::PROFILE.scoped_pattern(user_id))
            .await
    }

    /// Everything derived from users.
    ///
    /// With a user id, that user's entity, permission and group keys are
    /// dropped. Without one, permission and group keys of every user are
    /// swept, which is what a change to the permission model needs. The
    /// user listings and dashboard aggregates are swept in both cases.
    pub async fn invalidate_all_user_related_cache(&self, user_id: Option<&str>) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        let mut patterns = match user_id {
            Some(id) => vec![
                KeyFamily::USER.scoped_pattern(id),
                KeyFamily::USER_PERMISSIONS.scoped_pattern(id),
                KeyFamily::USER_GROUPS.scoped_pattern(id),
            ],
            None => vec![
                KeyFamily::USER_PERMISSIONS.list_pattern(),
                KeyFamily::USER_GROUPS.list_pattern(),
            ],
        };
        patterns.push(KeyFamily::USERS_LIST.list_pattern());
        patterns.push(KeyFamily::DASHBOARD.list_pattern());
        self.sweep(&patterns).await
    }

    // ── Groups and permissions ─────────────────────────────

    /// A group was created, updated or deleted, or its membership changed.
    pub async fn invalidate_group_cache(&self, group_id: &str) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.sweep(&[
            KeyFamily::GROUP.scoped_pattern(group_id),
            KeyFamily::GROUPS_LIST.list_pattern(),
            KeyFamily::USER_GROUPS.list_pattern(),
            KeyFamily::DASHBOARD.list_pattern(),
        ])
        .await
    }

    /// A permission definition or assignment changed.
    pub async fn invalidate_permission_cache(&self, permission_id: &str) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.sweep(&[
            KeyFamily::PERMISSION.scoped_pattern(permission_id),
            KeyFamily::PERMISSIONS_LIST.list_pattern(),
            KeyFamily::USER_PERMISSIONS.list_pattern(),
            KeyFamily::DASHBOARD.list_pattern(),
        ])
        .await
    }

    // ── Dashboard, notifications, activity ─────────────────

    /// Dashboard aggregates.
    pub async fn invalidate_dashboard_cache(&self) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.invalidate_by_pattern(&KeyFamily::DASHBOARD.list_pattern())
            .await
    }

    /// Notifications of one user changed (new, read, deleted).
    pub async fn invalidate_notification_cache(&self, user_id: &str) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.sweep(&[
            KeyFamily::NOTIFICATION.scoped_pattern(user_id),
            KeyFamily::DASHBOARD.list_pattern(),
        ])
        .await
    }

    /// A new activity log entry was written.
    pub async fn invalidate_activity_cache(&self) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.sweep(&[
            KeyFamily::ACTIVITY.list_pattern(),
            KeyFamily::DASHBOARD.list_pattern(),
        ])
        .await
    }

    // ── Media, analytics, settings ─────────────────────────

    /// A media item was uploaded, edited or deleted. Without an id only
    /// the listings and aggregates are swept.
    pub async fn invalidate_media_cache(&self, media_id: Option<&str>) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        let mut patterns = vec![
            KeyFamily::MEDIA_LIST.list_pattern(),
            KeyFamily::DASHBOARD.list_pattern(),
        ];
        if let Some(id) = media_id {
            patterns.push(KeyFamily::MEDIA.scoped_pattern(id));
        }
        self.sweep(&patterns).await
    }

    /// System analytics snapshots.
    pub async fn invalidate_system_analytics_cache(&self) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.invalidate_by_pattern(&KeyFamily::SYSTEM_ANALYTICS.list_pattern())
            .await
    }

    /// Project settings.
    pub async fn invalidate_project_settings_cache(&self) -> u64 {
        if !self.cache.is_enabled() {
            return 0;
        }
        self.invalidate_by_pattern(&KeyFamily::PROJECT_SETTINGS.list_pattern())
            .await
    }
}
