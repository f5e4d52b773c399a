//! End-to-end checks against a started config service over plain TCP.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dconfig::config::ServiceConfig;
use dconfig::model::ApolloConfig;
use dconfig::model::AppNamespace;
use dconfig::model::ConfigNotification;
use dconfig::model::Coordinate;
use dconfig::ConfigServerBuilder;
use dconfig::MemoryConfigStore;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;

fn local_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.server.listen_address = "127.0.0.1:0".parse().unwrap();
    config.message.scan_interval_in_ms = 10;
    config
}

fn encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

async fn http_get(
    addr: SocketAddr,
    path_and_query: &str,
) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path_and_query} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    (status, body.to_string())
}

#[tokio::test]
async fn test_published_release_wakes_long_poll_and_serves_new_config() {
    let store = Arc::new(MemoryConfigStore::new());
    store.register_namespace(AppNamespace::new("someAppId", "application", false));
    let coordinate = Coordinate::new("someAppId", "default", "DEV", "application");
    let (_, first) = store.publish_release(&coordinate, BTreeMap::from([("timeout".into(), "100".into())]));

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let server = ConfigServerBuilder::new(local_config(), shutdown_rx)
        .with_store(store.clone())
        .build()
        .unwrap();
    let registry = server.notification_service().registry().clone();
    let running = server.start().await.unwrap();
    let addr = running.local_addr();

    let (status, body) = http_get(addr, "/configs/someAppId/default/application?env=DEV").await;
    assert_eq!(status, 200);
    let config: ApolloConfig = serde_json::from_str(&body).unwrap();
    assert_eq!(config.configurations["timeout"], "100");

    let notifications = encode(&format!(
        r#"[{{"namespaceName":"application","notificationId":{}}}]"#,
        first.id
    ));
    let poll = tokio::spawn(async move {
        http_get(
            addr,
            &format!("/notifications/v2?appId=someAppId&cluster=default&env=DEV&notifications={notifications}"),
        )
        .await
    });
    tokio::time::timeout(Duration::from_secs(2), async {
        while registry.watched_key_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("long poll should be parked");

    // only the message log learns about this release; the scanner relays it
    let (_, second) = store.publish_release(&coordinate, BTreeMap::from([("timeout".into(), "200".into())]));

    let (status, body) = tokio::time::timeout(Duration::from_secs(2), poll)
        .await
        .expect("long poll should be woken")
        .unwrap();
    assert_eq!(status, 200);
    let changed: Vec<ConfigNotification> = serde_json::from_str(&body).unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].namespace_name, "application");
    assert_eq!(changed[0].notification_id, second.id);

    let messages = encode(&serde_json::to_string(changed[0].messages.as_ref().unwrap()).unwrap());
    let (status, body) = http_get(
        addr,
        &format!("/configs/someAppId/default/application?env=DEV&messages={messages}"),
    )
    .await;
    assert_eq!(status, 200);
    let config: ApolloConfig = serde_json::from_str(&body).unwrap();
    assert_eq!(config.configurations["timeout"], "200");

    let (status, _) = http_get(
        addr,
        &format!(
            "/configs/someAppId/default/application?env=DEV&releaseKey={}",
            encode(&config.release_key)
        ),
    )
    .await;
    assert_eq!(status, 304);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), running.wait())
        .await
        .expect("server should stop")
        .unwrap();
}

#[tokio::test]
async fn test_unknown_app_is_not_found_and_bad_poll_is_rejected() {
    let store = Arc::new(MemoryConfigStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let running = ConfigServerBuilder::new(local_config(), shutdown_rx)
        .with_store(store)
        .build()
        .unwrap()
        .start()
        .await
        .unwrap();
    let addr = running.local_addr();

    let (status, body) = http_get(addr, "/configs/missingApp/default/application?env=DEV").await;
    assert_eq!(status, 404);
    assert!(body.contains("missingApp"));

    let (status, _) = http_get(
        addr,
        "/notifications/v2?appId=missingApp&cluster=default&env=DEV&notifications=oops",
    )
    .await;
    assert_eq!(status, 400);

    shutdown_tx.send(()).unwrap();
    running.wait().await.unwrap();
}
