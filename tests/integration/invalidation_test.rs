//! Integration tests for mutation-driven invalidation.

use console_cache::{CacheParams, KeyFamily};

use crate::helpers::{TestCache, users_page};

#[tokio::test]
async fn test_user_update_spares_other_users() {
    let cache = TestCache::new().await;
    let user_one = KeyFamily::USER.entity("1");
    let user_ten = KeyFamily::USER.entity("10");
    let profile = KeyFamily::PROFILE.entity("1");
    let listing = users_page(1, 20).key;
    let dashboard = KeyFamily::DASHBOARD.entity("overview");
    let group = KeyFamily::GROUP.entity("1");

    for key in [&user_one, &user_ten, &profile, &listing, &dashboard, &group] {
        cache.seed(key).await;
    }

    assert_eq!(cache.layer.invalidator.invalidate_user_cache("1").await, 4);

    assert!(!cache.contains(&user_one).await);
    assert!(!cache.contains(&profile).await);
    assert!(!cache.contains(&listing).await);
    assert!(!cache.contains(&dashboard).await);
    assert!(cache.contains(&user_ten).await);
    assert!(cache.contains(&group).await);
}

#[tokio::test]
async fn test_invalidation_is_idempotent() {
    let cache = TestCache::new().await;
    cache.seed(&KeyFamily::DASHBOARD.entity("overview")).await;

    assert_eq!(cache.layer.invalidator.invalidate_dashboard_cache().await, 1);
    assert_eq!(cache.layer.invalidator.invalidate_dashboard_cache().await, 0);
}

#[tokio::test]
async fn test_permission_model_change_sweeps_every_user() {
    let cache = TestCache::new().await;
    let params = CacheParams::new().with("scope", "admin");
    let keys = [
        KeyFamily::USER_PERMISSIONS.entity("1"),
        KeyFamily::USER_PERMISSIONS.key(Some("2"), &params),
        KeyFamily::USER_GROUPS.entity("3"),
        users_page(1, 20).key,
    ];
    for key in &keys {
        cache.seed(key).await;
    }
    let kept = KeyFamily::USER.entity("1");
    cache.seed(&kept).await;

    assert_eq!(
        cache
            .layer
            .invalidator
            .invalidate_all_user_related_cache(None)
            .await,
        4
    );
    assert!(cache.contains(&kept).await);
}

#[tokio::test]
async fn test_notifications_are_scoped_to_recipient() {
    let cache = TestCache::new().await;
    let unread = CacheParams::new().with("unread", true);
    let mine = KeyFamily::NOTIFICATION.key(Some("7"), &unread);
    let theirs = KeyFamily::NOTIFICATION.key(Some("8"), &unread);
    cache.seed(&mine).await;
    cache.seed(&theirs).await;

    assert_eq!(
        cache.layer.invalidator.invalidate_notification_cache("7").await,
        1
    );
    assert!(cache.contains(&theirs).await);
}

#[tokio::test]
async fn test_ids_with_separators_are_isolated() {
    let cache = TestCache::new().await;
    let tricky = KeyFamily::MEDIA.entity("a:b");
    let plain = KeyFamily::MEDIA.entity("a");
    cache.seed(&tricky).await;
    cache.seed(&plain).await;

    assert_eq!(
        cache.layer.invalidator.invalidate_media_cache(Some("a")).await,
        1
    );
    assert!(cache.contains(&tricky).await);
}

#[tokio::test]
async fn test_disabled_invalidation_returns_zero() {
    let cache = TestCache::disabled().await;
    assert_eq!(cache.layer.invalidator.invalidate_user_cache("1").await, 0);
    assert_eq!(cache.layer.invalidator.invalidate_project_settings_cache().await, 0);
    assert_eq!(cache.layer.invalidator.flush_all().await, 0);
}
