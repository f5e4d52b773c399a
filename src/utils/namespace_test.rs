use super::namespace::*;
use crate::model::AppNamespace;
use crate::MemoryConfigStore;

#[test]
fn test_filter_namespace_name() {
    assert_eq!(filter_namespace_name("application.properties"), "application");
    assert_eq!(filter_namespace_name("FX.apollo.PROPERTIES"), "FX.apollo");
    assert_eq!(filter_namespace_name("datasource.yml"), "datasource.yml");
    assert_eq!(filter_namespace_name("application"), "application");
    assert_eq!(filter_namespace_name(".properties"), "");
    assert_eq!(filter_namespace_name("props"), "props");
    // multi-byte input must not split a character
    assert_eq!(filter_namespace_name("配置中心属性文件"), "配置中心属性文件");
}

#[tokio::test]
async fn test_normalize_namespace_prefers_registered_spelling() {
    let store = MemoryConfigStore::new();
    store.register_namespace(AppNamespace::new("someAppId", "Datasource", false));
    store.register_namespace(AppNamespace::new("publicAppId", "FX.apollo", true));

    assert_eq!(
        normalize_namespace(&store, "someAppId", "datasource").await.unwrap(),
        "Datasource"
    );
    assert_eq!(
        normalize_namespace(&store, "someAppId", "fx.APOLLO").await.unwrap(),
        "FX.apollo"
    );
    assert_eq!(
        normalize_namespace(&store, "someAppId", "unknown").await.unwrap(),
        "unknown"
    );
}
