use std::collections::BTreeMap;

use super::MemoryConfigStore;
use super::SeedData;
use crate::model::AppNamespace;
use crate::model::Coordinate;
use crate::NamespaceRegistry;
use crate::ReleaseMessageStore;
use crate::ReleaseStore;

fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::test]
async fn publish_should_make_release_active_and_append_message() {
    let store = MemoryConfigStore::new();
    let coordinate = Coordinate::new("app", "default", "dev", "application");

    let (release, message) = store.publish_release(&coordinate, props(&[("timeout", "100")]));

    assert_eq!(message.message, "app+default+dev+application");
    let active = store
        .find_latest_active_release("app", "default", "dev", "application")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active, release);
    assert_eq!(active.configurations.get("timeout").map(String::as_str), Some("100"));
    assert_eq!(store.find_active_release_by_id(release.id).await.unwrap(), Some(release));
}

#[tokio::test]
async fn latest_release_should_win_and_rollback_restores_previous() {
    let store = MemoryConfigStore::new();
    let coordinate = Coordinate::new("app", "default", "dev", "application");
    let (first, _) = store.publish_release(&coordinate, props(&[("k", "1")]));
    let (second, m2) = store.publish_release(&coordinate, props(&[("k", "2")]));

    let active = store.find_latest_active_release("app", "default", "dev", "application").await.unwrap();
    assert_eq!(active.map(|r| r.id), Some(second.id));

    let rollback = store.rollback_release(second.id).unwrap();
    assert!(rollback.id > m2.id);
    assert_eq!(rollback.message, m2.message);

    let active = store.find_latest_active_release("app", "default", "dev", "application").await.unwrap();
    assert_eq!(active.map(|r| r.id), Some(first.id));
    assert_eq!(store.find_active_release_by_id(second.id).await.unwrap(), None);
    // rolling back twice is refused
    assert!(store.rollback_release(second.id).is_none());
}

#[tokio::test]
async fn message_queries_should_respect_keys_and_order() {
    let store = MemoryConfigStore::new();
    let m1 = store.append_release_message("a+default+dev+ns");
    let m2 = store.append_release_message("b+default+dev+ns");
    let m3 = store.append_release_message("a+default+dev+ns");

    let keys = vec!["a+default+dev+ns".to_string(), "missing".to_string()];
    assert_eq!(store.find_latest_release_message(&keys).await.unwrap(), Some(m3.clone()));

    let mut grouped = store
        .find_latest_release_messages_group_by_keys(&["a+default+dev+ns".to_string(), "b+default+dev+ns".to_string()])
        .await
        .unwrap();
    grouped.sort_by_key(|m| m.id);
    assert_eq!(grouped, vec![m2.clone(), m3.clone()]);

    let after = store.find_release_messages_after(m1.id, 10).await.unwrap();
    assert_eq!(after, vec![m2.clone(), m3.clone()]);
    let limited = store.find_release_messages_after(0, 1).await.unwrap();
    assert_eq!(limited, vec![m1]);
    assert_eq!(store.find_max_message_id().await.unwrap(), Some(m3.id));
}

#[tokio::test]
async fn empty_store_should_report_absence() {
    let store = MemoryConfigStore::new();

    assert_eq!(store.find_max_message_id().await.unwrap(), None);
    assert_eq!(store.find_latest_release_message(&["k".to_string()]).await.unwrap(), None);
    assert_eq!(store.find_latest_active_release("a", "b", "c", "d").await.unwrap(), None);
}

#[tokio::test]
async fn namespace_lookups_should_ignore_case() {
    let store = MemoryConfigStore::new();
    store.register_namespace(AppNamespace::new("app", "application", false));
    store.register_namespace(AppNamespace::new("owner", "FX.apollo", true));

    let found = store.find_app_namespace("app", "Application").await.unwrap().unwrap();
    assert_eq!(found.name, "application");

    let public = store.find_public_namespace("fx.Apollo").await.unwrap().unwrap();
    assert_eq!(public.name, "FX.apollo");
    assert_eq!(public.app_id, "owner");

    let publics = store
        .find_public_namespaces_by_names(&["fx.apollo".to_string(), "FX.APOLLO".to_string(), "nope".to_string()])
        .await
        .unwrap();
    assert_eq!(publics.len(), 1);

    let owned = store
        .find_namespaces_owned_by_app("owner", &["fx.apollo".to_string(), "application".to_string()])
        .await
        .unwrap();
    assert_eq!(owned, vec!["FX.apollo".to_string()]);
}

#[tokio::test]
async fn seed_file_should_populate_store() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("seed.json");
    std::fs::write(
        &path,
        r#"{
            "namespaces": [
                {"appId": "app", "name": "application"},
                {"appId": "shared", "name": "common", "isPublic": true}
            ],
            "releases": [
                {"appId": "app", "cluster": "default", "env": "dev", "namespace": "application",
                 "configurations": {"a": "1"}}
            ]
        }"#,
    )
    .unwrap();

    let store = MemoryConfigStore::new();
    store.load_seed(&path).await.unwrap();

    assert!(store.find_public_namespace("common").await.unwrap().is_some());
    let release = store
        .find_latest_active_release("app", "default", "dev", "application")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(release.configurations.get("a").map(String::as_str), Some("1"));
    assert_eq!(store.find_max_message_id().await.unwrap(), Some(1));
}

#[tokio::test]
async fn malformed_seed_file_should_fail() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("seed.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = MemoryConfigStore::new();
    assert!(matches!(store.load_seed(&path).await, Err(crate::Error::Json(_))));
    store.apply_seed(SeedData::default());
}
