use std::collections::HashSet;

use super::*;

#[test]
fn watch_key_should_join_components_in_order() {
    assert_eq!(watch_key("app", "default", "dev", "application"), "app+default+dev+application");
}

#[test]
fn watch_keys_differ_when_any_component_differs() {
    let base = watch_key("a", "c", "e", "n");
    assert_ne!(base, watch_key("b", "c", "e", "n"));
    assert_ne!(base, watch_key("a", "d", "e", "n"));
    assert_ne!(base, watch_key("a", "c", "f", "n"));
    assert_ne!(base, watch_key("a", "c", "e", "m"));
    assert_eq!(base, watch_key("a", "c", "e", "n"));
}

#[test]
fn split_should_return_the_four_components() {
    let parts = split_watch_key("app+cluster+prod+fx.apollo").unwrap();

    assert_eq!(parts.app_id, "app");
    assert_eq!(parts.cluster, "cluster");
    assert_eq!(parts.env, "prod");
    assert_eq!(parts.namespace, "fx.apollo");
}

#[test]
fn split_should_reject_malformed_keys() {
    assert!(split_watch_key("").is_none());
    assert!(split_watch_key("app+cluster+prod").is_none());
    assert!(split_watch_key("app+cluster+prod+ns+extra").is_none());
    // empty segments are omitted before counting
    assert!(split_watch_key("app++prod+ns").is_none());
}

#[test]
fn split_should_skip_empty_segments() {
    let parts = split_watch_key("+app+cluster++prod+ns+").unwrap();
    assert_eq!(parts.app_id, "app");
    assert_eq!(parts.namespace, "ns");
}

#[test]
fn namespace_of_should_return_last_component() {
    assert_eq!(namespace_of("a+default+dev+application"), Some("application"));
    assert_eq!(namespace_of("broken"), None);
}

#[test]
fn release_keys_should_be_unique_for_same_coordinate() {
    let keys: HashSet<String> = (0..1000).map(|_| generate_release_key("app", "default", "ns")).collect();

    assert_eq!(keys.len(), 1000);
}

#[test]
fn release_key_should_start_with_timestamp() {
    let key = generate_release_key("app", "default", "ns");
    let (timestamp, hex) = key.split_once('-').unwrap();

    assert!(timestamp.parse::<u64>().unwrap() > 1_609_459_200_000);
    assert_eq!(hex.len(), 20);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
}
