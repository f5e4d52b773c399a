use super::*;

fn create_test_registry() -> Registry {
    let registry = Registry::new_custom(Some("dconfig".to_string()), None).unwrap();
    register_custom_metrics(&registry);
    registry
}

#[test]
fn test_custom_registry() {
    let registry = create_test_registry();

    record_cache_event("get");
    let metrics = &registry.gather();
    assert!(!metrics.is_empty());

    let metric_names: Vec<_> = metrics.iter().map(|m| m.get_name()).collect();
    assert!(
        metric_names.contains(&"dconfig_config_cache_events"),
        "Missing dconfig_config_cache_events"
    );
}

#[test]
fn test_counter_increment() {
    LONG_POLL_EVENTS.with_label_values(&["test_only"]).reset();

    record_long_poll_event("test_only");
    record_long_poll_event("test_only");

    let value = LONG_POLL_EVENTS.with_label_values(&["test_only"]).get();
    assert_eq!(value, 2, "Counter should increment correctly");
}

#[tokio::test]
async fn test_metrics_endpoint_format() {
    let registry = create_test_registry();
    record_cache_event("load");

    let metrics_route = warp::path!("metrics")
        .map(move || registry.clone())
        .and_then(metrics_handler);

    let response = warp::test::request()
        .method("GET")
        .path("/metrics")
        .reply(&metrics_route)
        .await;

    assert_eq!(response.status(), 200);
    let body = String::from_utf8(response.body().to_vec()).unwrap();
    assert!(body.contains("dconfig_config_cache_events"));
    assert!(body.contains("# TYPE"));
}
