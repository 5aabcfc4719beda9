mod common;

use common::{
    connect, http_url, next_event, next_event_named, send, start_hub, wait_until,
};
use control_hub_core::{PlayerController, PlayerObserver};
use reqwest::StatusCode;

fn queue_len(hub: &control_hub_core::ControlHub) -> usize {
    let snapshot: serde_json::Value =
        serde_json::from_str(&hub.snapshot_json(false).unwrap()).unwrap();
    snapshot["queue"]["items"].as_array().map_or(0, Vec::len)
}

#[tokio::test]
async fn http_queries_follow_status_contract() {
    let (hub, player, port) = start_hub(false).await;

    let response = reqwest::get(http_url(port, "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["server"], "ClapperControlHub");
    assert_eq!(response.headers()["content-type"], "application/json");
    let snapshot: serde_json::Value = response.json().await.unwrap();
    assert!(snapshot.get("event").is_none());
    assert_eq!(snapshot["queue"]["played_index"], 4294967295u64);
    assert_eq!(snapshot["queue"]["controllable"], false);

    // Unknown item: 204 with an empty body.
    let response = reqwest::get(http_url(port, "/item?id=7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.text().await.unwrap().is_empty());

    let response = reqwest::get(http_url(port, "/tags?id=7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    for bad in ["/item", "/item?id=abc", "/item?id=-3", "/tags?id=99999999999"] {
        let response = reqwest::get(http_url(port, bad)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", bad);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["status"], 400);
    }

    player.queue_append("file:///videos/intro.mkv");
    wait_until(|| queue_len(&hub) == 1).await;

    let response = reqwest::get(http_url(port, "/item?id=1&timeline=TRUE"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.text().await.unwrap();
    assert_eq!(
        text,
        r#"{"id":1,"title":"intro.mkv","duration":60.000,"timeline":[]}"#
    );

    let response = reqwest::get(http_url(port, "/tags?id=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(response.text().await.unwrap(), "taglist;");

    hub.set_active(false).await.unwrap();
}

#[tokio::test]
async fn clients_share_ordered_deltas_and_late_joiners_get_snapshot() {
    let (hub, _player, port) = start_hub(true).await;

    let mut a = connect(port).await;
    let mut b = connect(port).await;
    assert_eq!(next_event(&mut a).await["event"], "snapshot");
    assert_eq!(next_event(&mut b).await["event"], "snapshot");

    send(&mut a, "add:file:///music/track.flac").await;

    for client in [&mut a, &mut b] {
        let event = next_event(client).await;
        assert_eq!(event["event"], "item_added");
        assert_eq!(event["id"], 1);
        assert_eq!(event["index"], 0);
    }

    let mut c = connect(port).await;
    let snapshot = next_event(&mut c).await;
    assert_eq!(snapshot["event"], "snapshot");
    assert_eq!(snapshot["queue"]["controllable"], true);
    assert_eq!(snapshot["queue"]["items"][0]["id"], 1);
    assert_eq!(snapshot["queue"]["items"][0]["title"], "track.flac");

    send(&mut c, "select:1").await;
    for client in [&mut a, &mut b, &mut c] {
        let event = next_event(client).await;
        assert_eq!(event["event"], "played_index_changed");
        assert_eq!(event["played_index"], 0);
    }

    hub.set_active(false).await.unwrap();
}

#[tokio::test]
async fn queue_commands_are_ignored_when_not_controllable() {
    let (hub, player, port) = start_hub(false).await;
    player.queue_append("file:///videos/a.mkv");
    wait_until(|| queue_len(&hub) == 1).await;

    let mut ws = connect(port).await;
    let snapshot = next_event(&mut ws).await;
    assert_eq!(snapshot["queue"]["items"][0]["id"], 1);

    send(&mut ws, "remove:1").await;
    send(&mut ws, "set_volume:0.5").await;

    let (event, before) = next_event_named(&mut ws, "volume_changed").await;
    assert_eq!(event["volume"].as_f64(), Some(0.5));
    assert!(before.iter().all(|e| e["event"] != "item_removed"));
    assert!(!player.calls().iter().any(|c| c.starts_with("remove")));
    assert_eq!(queue_len(&hub), 1);

    hub.set_active(false).await.unwrap();
}

#[tokio::test]
async fn malformed_commands_keep_connection_open() {
    let (hub, player, port) = start_hub(false).await;
    let mut ws = connect(port).await;
    next_event(&mut ws).await;

    send(&mut ws, "seek:foo").await;
    send(&mut ws, "launch_rockets").await;
    send(&mut ws, "seek:12").await;

    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "position_changed");
    assert_eq!(event["position"].as_f64(), Some(12.0));
    assert_eq!(player.calls(), vec!["seek 12"]);

    hub.set_active(false).await.unwrap();
}

#[tokio::test]
async fn toggle_play_follows_mirrored_state() {
    let (hub, _player, port) = start_hub(false).await;
    let mut ws = connect(port).await;
    next_event(&mut ws).await;

    send(&mut ws, "toggle_play").await;
    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "state_changed");
    assert_eq!(event["state"], 3);

    send(&mut ws, "toggle_play").await;
    let event = next_event(&mut ws).await;
    assert_eq!(event["state"], 2);

    hub.set_active(false).await.unwrap();
}

#[tokio::test]
async fn position_updates_are_coalesced_per_second() {
    let (hub, _player, port) = start_hub(false).await;
    hub.position_changed(1.2);

    let mut ws = connect(port).await;
    let snapshot = next_event(&mut ws).await;
    assert_eq!(snapshot["position"].as_f64(), Some(1.2));

    hub.position_changed(1.8);
    hub.position_changed(2.1);
    hub.volume_changed(0.3);

    let (event, before) = next_event_named(&mut ws, "volume_changed").await;
    assert_eq!(event["volume"].as_f64(), Some(0.3));
    assert_eq!(before.len(), 1);
    assert_eq!(before[0]["event"], "position_changed");
    assert_eq!(before[0]["position"].as_f64(), Some(2.1));

    hub.set_active(false).await.unwrap();
}
