//! Integration tests for behaviour when the store is unreachable.

use console_cache::KeyFamily;
use console_core::error::ErrorKind;

use crate::helpers::{TestCache, UserDirectory, users_page};

#[tokio::test]
async fn test_reads_fall_through_to_compute() {
    let cache = TestCache::failing();
    let directory = UserDirectory::with_users(&["ann", "bob"]);
    let options = users_page(1, 20);

    for _ in 0..2 {
        let users = cache
            .layer
            .orchestrator
            .with_cache(&options, || directory.list(1, 20))
            .await
            .unwrap();
        assert_eq!(users.len(), 2);
    }
    assert_eq!(directory.queries(), 2);

    let refreshed = cache
        .layer
        .orchestrator
        .re_cache(&options, || directory.list(1, 20))
        .await
        .unwrap();
    assert_eq!(refreshed.len(), 2);
}

#[tokio::test]
async fn test_compute_error_reaches_caller() {
    let cache = TestCache::failing();
    let err = cache
        .layer
        .orchestrator
        .with_cache(&users_page(1, 20), || async {
            Err::<Vec<String>, _>("database unavailable".to_string())
        })
        .await
        .unwrap_err();
    assert_eq!(err, "database unavailable");
}

#[tokio::test]
async fn test_invalidation_swallows_store_errors() {
    let cache = TestCache::failing();
    let invalidator = &cache.layer.invalidator;

    assert_eq!(invalidator.invalidate_user_cache("1").await, 0);
    assert_eq!(invalidator.invalidate_key(&KeyFamily::GROUP.entity("1")).await, 0);
    assert_eq!(invalidator.flush_all().await, 0);
    assert_eq!(cache.layer.inspector.delete_private_keys("1").await, 0);
}

#[tokio::test]
async fn test_inspection_reports_unhealthy_store() {
    let cache = TestCache::failing();

    let err = cache.layer.inspector.list_keys(None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cache);

    let status = cache.layer.inspector.status().await.unwrap();
    assert_eq!(status.backend, "failing");
    assert!(status.enabled);
    assert!(!status.healthy);
    assert_eq!(status.total_keys, 0);
}
