//! Integration tests for the operator inspection view.

use console_cache::{CacheParams, KeyFamily, Privacy};

use crate::helpers::{TestCache, UserDirectory, users_page};

async fn populated() -> TestCache {
    let cache = TestCache::new().await;
    let directory = UserDirectory::with_users(&["ann", "bob"]);
    cache
        .layer
        .orchestrator
        .with_cache(&users_page(1, 20), || directory.list(1, 20))
        .await
        .unwrap();

    for key in [
        KeyFamily::USER.entity("1"),
        KeyFamily::USER.entity("2"),
        KeyFamily::USER_PERMISSIONS.entity("1"),
        KeyFamily::NOTIFICATION.key(Some("2"), &CacheParams::new().with("unread", true)),
        KeyFamily::PROJECT_SETTINGS.root(),
    ] {
        cache.seed(&key).await;
    }
    cache
}

#[tokio::test]
async fn test_listing_classifies_every_key() {
    let cache = populated().await;
    let keys = cache.layer.inspector.list_keys(None).await.unwrap();
    assert_eq!(keys.len(), 6);

    let private: Vec<&str> = keys
        .iter()
        .filter_map(|k| k.privacy.owner())
        .collect();
    assert_eq!(private, vec!["2", "1", "1", "2"]);

    let listing = keys
        .iter()
        .find(|k| k.key == "users-list:limit=20:page=1")
        .unwrap();
    assert_eq!(listing.privacy, Privacy::Public);
    assert_eq!(listing.ttl_remaining, Some(5));
    assert!(listing.size_estimate > 0);
}

#[tokio::test]
async fn test_principal_sees_public_and_own_keys() {
    let cache = populated().await;
    let keys = cache.layer.inspector.list_keys(Some("1")).await.unwrap();

    assert!(keys.iter().all(|k| k.privacy.visible_to("1")));
    let names: Vec<&str> = keys.iter().map(|k| k.key.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "project-settings:all",
            "user-permissions:1:all",
            "user:1:all",
            "users-list:limit=20:page=1",
        ]
    );
}

#[tokio::test]
async fn test_purging_a_principal_leaves_others() {
    let cache = populated().await;
    assert_eq!(cache.layer.inspector.delete_private_keys("2").await, 2);

    let status = cache.layer.inspector.status().await.unwrap();
    assert_eq!(status.backend, "memory");
    assert_eq!(status.total_keys, 4);
    assert_eq!(status.private_keys, 2);
    assert_eq!(status.public_keys, 2);
}

#[tokio::test]
async fn test_single_delete_and_flush() {
    let cache = populated().await;
    assert_eq!(cache.layer.inspector.delete_key("user:1:all").await, 1);
    assert_eq!(cache.layer.inspector.delete_key("user:1:all").await, 0);

    assert_eq!(cache.layer.inspector.flush_all().await, 5);
    assert!(cache.layer.inspector.list_keys(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_serializes_for_the_operations_page() {
    let cache = populated().await;
    let keys = cache.layer.inspector.list_keys(Some("2")).await.unwrap();
    let json = serde_json::to_value(&keys).unwrap();

    let notification = json
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["key"] == "notification:2:unread=true")
        .unwrap();
    assert_eq!(notification["type"], "string");
    assert_eq!(notification["privacy"], "private");
    assert_eq!(notification["owner"], "2");
}

#[tokio::test]
async fn test_disabled_cache_has_nothing_to_inspect() {
    let cache = TestCache::disabled().await;
    assert!(cache.layer.inspector.list_keys(None).await.unwrap().is_empty());

    let status = cache.layer.inspector.status().await.unwrap();
    assert_eq!(status.backend, "disabled");
    assert!(!status.enabled);
    assert_eq!(status.total_keys, 0);
}
