use serial_test::serial;
use temp_env::with_vars;

use super::*;
use crate::Error;

fn cleanup_all_dconfig_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DCONFIG__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = ServiceConfig::default();

    assert_eq!(config.cache.expire_after_access_in_secs, 3600);
    assert_eq!(config.long_poll.timeout_in_ms, 60_000);
    assert_eq!(config.long_poll.notification_batch_size, 100);
    assert_eq!(config.message.scan_interval_in_ms, 1000);
    assert_eq!(config.server.listen_address.port(), 8080);
    assert!(config.server.seed_path.is_none());
    assert!(!config.monitoring.prometheus_enabled);
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_dconfig_env_vars();
    with_vars(
        vec![
            ("DCONFIG__LONG_POLL__TIMEOUT_IN_MS", Some("30000")),
            ("DCONFIG__CACHE__EXPIRE_AFTER_ACCESS_IN_SECS", Some("120")),
        ],
        || {
            let config = ServiceConfig::new().unwrap();

            assert_eq!(config.long_poll.timeout_in_ms, 30_000);
            assert_eq!(config.cache.expire_after_access_in_secs, 120);
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_dconfig_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dynamic_config.toml");

    std::fs::write(
        &config_path,
        r#"
        [server]
        listen_address = "127.0.0.1:18080"

        [long_poll]
        notification_batch_size = 10
        notification_batch_interval_ms = 5
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = ServiceConfig::new().expect("success");
        let result = base_config.with_override_config(config_path.to_str().unwrap());

        assert!(result.is_ok());
        let config = result.unwrap();

        assert_eq!(config.server.listen_address.port(), 18080);
        assert_eq!(config.long_poll.notification_batch_size, 10);
        assert_eq!(config.long_poll.notification_batch_interval_ms, 5);
        // untouched sections keep their defaults
        assert_eq!(config.long_poll.timeout_in_ms, 60_000);
        assert_eq!(config.cache.sweep_interval_in_secs, 60);
    });
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_dconfig_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("test_config.toml");
    std::fs::write(
        &config_path,
        r#"
        [message]
        scan_interval_in_ms = 250
        scan_batch_size = 50
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("DCONFIG__MESSAGE__SCAN_INTERVAL_IN_MS", Some("750")),
        ],
        || {
            let config = ServiceConfig::new().unwrap();

            assert_eq!(config.message.scan_interval_in_ms, 750);
            assert_eq!(config.message.scan_batch_size, 50);
        },
    );
}

#[test]
fn validation_should_accept_defaults() {
    assert!(ServiceConfig::default().validate().is_ok());
}

#[test]
fn validation_should_reject_zero_long_poll_timeout() {
    let mut config = ServiceConfig::default();
    config.long_poll.timeout_in_ms = 0;

    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn validation_should_reject_zero_cache_expiry() {
    let mut config = ServiceConfig::default();
    config.cache.expire_after_access_in_secs = 0;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_missing_seed_file() {
    let mut config = ServiceConfig::default();
    config.server.seed_path = Some("/definitely/not/here.json".into());

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_privileged_prometheus_port() {
    let mut config = ServiceConfig::default();
    config.monitoring.prometheus_enabled = true;
    config.monitoring.prometheus_port = 80;

    assert!(config.validate().is_err());
}

#[test]
fn duration_helpers_should_convert_units() {
    let config = ServiceConfig::default();

    assert_eq!(config.cache.expire_after_access().as_secs(), 3600);
    assert_eq!(config.long_poll.timeout().as_millis(), 60_000);
    assert_eq!(config.message.scan_interval().as_millis(), 1000);
}

#[test]
fn validation_should_reject_metrics_on_the_service_port() {
    let mut config = ServiceConfig::default();
    config.monitoring.prometheus_enabled = true;
    config.monitoring.prometheus_port = config.server.listen_address.port();

    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
}
