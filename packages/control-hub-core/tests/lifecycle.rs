mod common;

use std::time::Duration;

use std::sync::Arc;

use common::{
    connect, create_hub, create_hub_with, http_url, next_event, start_hub, start_hub_with,
    test_config, wait_until,
};
use control_hub_core::HubConfig;
use futures::StreamExt;
use tokio::net::TcpStream;

#[tokio::test]
async fn activation_is_idempotent() {
    let (hub, _player, port) = start_hub(false).await;
    assert!(hub.is_active());

    hub.set_active(true).await.unwrap();
    assert_eq!(hub.port(), Some(port));

    hub.set_active(false).await.unwrap();
    assert!(!hub.is_active());
    assert_eq!(hub.port(), None);

    hub.set_active(false).await.unwrap();
    assert!(!hub.is_active());

    assert!(reqwest::get(http_url(port, "/")).await.is_err());
}

#[tokio::test]
async fn reactivation_serves_current_state() {
    let (hub, _player) = create_hub(false);
    hub.set_active(true).await.unwrap();
    hub.set_active(false).await.unwrap();

    hub.set_active(true).await.unwrap();
    let port = hub.port().unwrap();
    let response = reqwest::get(http_url(port, "/")).await.unwrap();
    assert!(response.status().is_success());

    hub.set_active(false).await.unwrap();
}

#[tokio::test]
async fn deactivation_closes_connections() {
    let (hub, _player, port) = start_hub(false).await;
    let mut ws = connect(port).await;
    next_event(&mut ws).await;
    assert_eq!(hub.connection_count(), 1);

    hub.set_active(false).await.unwrap();

    // Either a close frame or the end of the stream, never another event.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) => break,
                Some(Ok(msg)) if msg.is_close() => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());

    wait_until(|| hub.connection_count() == 0).await;
}

#[tokio::test]
async fn bind_failure_is_reported_and_hub_stays_inactive() {
    let listener = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
    let taken = listener.local_addr().unwrap().port();

    let (hub, player) = create_hub_with(HubConfig {
        preferred_port: taken,
        ..test_config()
    });

    assert!(hub.set_active(true).await.is_err());
    assert!(!hub.is_active());
    assert_eq!(player.errors(), vec!["server_error"]);
}

#[tokio::test]
async fn active_config_starts_serving() {
    let (hub, _player) = start_hub_with(HubConfig {
        active: true,
        ..test_config()
    })
    .await;
    assert!(hub.is_active());
    let port = hub.port().unwrap();
    let response = reqwest::get(http_url(port, "/")).await.unwrap();
    assert!(response.status().is_success());

    hub.set_active(false).await.unwrap();

    let (idle, _player) = start_hub_with(test_config()).await;
    assert!(!idle.is_active());
    assert_eq!(idle.port(), None);
}

#[tokio::test]
async fn dropping_active_hub_stops_serving() {
    let (hub, _player, port) = start_hub(false).await;
    let mut ws = connect(port).await;
    next_event(&mut ws).await;

    let weak = Arc::downgrade(&hub);
    drop(hub);
    assert!(weak.upgrade().is_none());

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) => break,
                Some(Ok(msg)) if msg.is_close() => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "listener still accepting after hub was dropped"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
