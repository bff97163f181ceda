//! Integration tests for read-through caching and forced refresh.

use std::time::Duration;

use crate::helpers::{TestCache, UserDirectory, users_page};

#[tokio::test]
async fn test_users_list_reflects_new_user_after_invalidation() {
    let cache = TestCache::new().await;
    let directory = UserDirectory::with_users(&["ann", "bob"]);
    let options = users_page(1, 20);
    assert_eq!(options.key.as_str(), "users-list:limit=20:page=1");

    let first = cache
        .layer
        .orchestrator
        .with_cache(&options, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    let cached = cache
        .layer
        .orchestrator
        .with_cache(&options, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(cached, first);
    assert_eq!(directory.queries(), 1);

    directory.create("cy");

    // Until the listing is invalidated the cached page is served.
    let stale = cache
        .layer
        .orchestrator
        .with_cache(&options, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(stale.len(), 2);

    assert_eq!(cache.layer.invalidator.invalidate_users_list_cache().await, 1);

    let fresh = cache
        .layer
        .orchestrator
        .with_cache(&options, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(directory.queries(), 2);
    assert!(fresh.iter().any(|u| u.name == "cy"));
}

#[tokio::test(start_paused = true)]
async fn test_short_tier_expires_with_configured_ttl() {
    let cache = TestCache::new().await;
    assert_eq!(cache.config.cache.durations.short, 5);
    let directory = UserDirectory::with_users(&["ann"]);
    let options = users_page(1, 20);

    cache
        .layer
        .orchestrator
        .with_cache(&options, || directory.list(1, 20))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(4)).await;
    cache
        .layer
        .orchestrator
        .with_cache(&options, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(directory.queries(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    cache
        .layer
        .orchestrator
        .with_cache(&options, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(directory.queries(), 2);
}

#[tokio::test]
async fn test_each_page_is_cached_separately() {
    let cache = TestCache::new().await;
    let directory = UserDirectory::with_users(&["ann", "bob", "cy"]);

    let page_one = cache
        .layer
        .orchestrator
        .with_cache(&users_page(1, 2), || directory.list(1, 2))
        .await
        .unwrap();
    let page_two = cache
        .layer
        .orchestrator
        .with_cache(&users_page(2, 2), || directory.list(2, 2))
        .await
        .unwrap();

    assert_eq!(page_one.len(), 2);
    assert_eq!(page_two.len(), 1);
    assert_eq!(directory.queries(), 2);

    // One sweep clears every page.
    assert_eq!(cache.layer.invalidator.invalidate_users_list_cache().await, 2);
}

#[tokio::test]
async fn test_refresh_flag_bypasses_cached_page() {
    let cache = TestCache::new().await;
    let directory = UserDirectory::with_users(&["ann"]);
    let options = users_page(1, 20);

    cache
        .layer
        .orchestrator
        .fetch(&options, false, || directory.list(1, 20))
        .await
        .unwrap();
    directory.create("bob");

    let refreshed = cache
        .layer
        .orchestrator
        .fetch(&options, true, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(refreshed.len(), 2);

    // The refresh repopulated the entry for later readers.
    let cached = cache
        .layer
        .orchestrator
        .fetch(&options, false, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(directory.queries(), 2);
}

#[tokio::test]
async fn test_default_tier_comes_from_config() {
    let cache = TestCache::new().await;
    let options = cache
        .layer
        .orchestrator
        .options(users_page(1, 20).key);
    assert_eq!(options.duration, cache.config.cache.default_duration);
}

#[tokio::test]
async fn test_disabled_cache_queries_every_time() {
    let cache = TestCache::disabled().await;
    let directory = UserDirectory::with_users(&["ann"]);
    let options = users_page(1, 20);

    for _ in 0..3 {
        cache
            .layer
            .orchestrator
            .with_cache(&options, || directory.list(1, 20))
            .await
            .unwrap();
    }
    assert_eq!(directory.queries(), 3);
    assert!(!cache.contains(&options.key).await);
}
