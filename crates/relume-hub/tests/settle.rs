//! End-to-end wire tests: browser handshake, reporter-driven notifications,
//! consolidated broadcasts at settle points.

use futures_util::{SinkExt, StreamExt};
use relume_config::ReloadOptions;
use relume_graph::{BundlePayload, ClientConfig, ReloadNotifier};
use relume_hub::{Hub, HubServer, RemoteNotifier, RunningHub};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_hub() -> RunningHub {
    let options = ReloadOptions {
        port: 0,
        ..Default::default()
    };
    HubServer::new(&options).unwrap().start().await.unwrap()
}

async fn wait_for_clients(hub: &Hub, count: usize) {
    for _ in 0..200 {
        if hub.client_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("hub never reached {} clients", count);
}

async fn connect_browser(running: &RunningHub, expected_clients: usize) -> Socket {
    let (mut socket, _) = connect_async(running.url()).await.unwrap();
    socket
        .send(Message::text(r#"{"type":"browser"}"#))
        .await
        .unwrap();
    wait_for_clients(&running.hub(), expected_clients).await;
    socket
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::text(value.to_string()))
        .await
        .unwrap();
}

async fn recv_json(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

fn empty_payload() -> BundlePayload {
    BundlePayload {
        modules: Default::default(),
        entries: vec!["/src/app.js".to_string()],
        client: ClientConfig::from_options(&ReloadOptions::default()),
    }
}

#[tokio::test]
async fn single_bundle_change_round_trip() {
    let running = start_hub().await;
    let mut browser = connect_browser(&running, 1).await;

    let (mut reporter, _) = connect_async(running.url()).await.unwrap();
    send_json(
        &mut reporter,
        json!({"type": "bundling", "data": null, "bundleId": "app"}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");

    send_json(
        &mut reporter,
        json!({"type": "reload", "bundleId": "app", "data": {"x": 1}}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");

    let change = recv_json(&mut browser).await;
    assert_eq!(change["type"], "change");
    assert_eq!(change["data"], json!({"app": {"x": 1}}));

    running.shutdown();
}

#[tokio::test]
async fn broadcast_consolidates_concurrent_bundles() {
    let running = start_hub().await;
    let mut browser = connect_browser(&running, 1).await;

    let (mut reporter, _) = connect_async(running.url()).await.unwrap();
    for id in ["a", "b"] {
        send_json(
            &mut reporter,
            json!({"type": "bundling", "data": null, "bundleId": id}),
        )
        .await;
        assert_eq!(recv_json(&mut reporter).await["type"], "ack");
    }

    send_json(
        &mut reporter,
        json!({"type": "reload", "bundleId": "a", "data": {"modules": "a"}}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");

    send_json(
        &mut reporter,
        json!({"type": "reload", "bundleId": "b", "data": {"modules": "b"}}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");

    // exactly one change frame, carrying both bundles
    let change = recv_json(&mut browser).await;
    assert_eq!(change["type"], "change");
    assert_eq!(
        change["data"],
        json!({"a": {"modules": "a"}, "b": {"modules": "b"}})
    );

    running.shutdown();
}

#[tokio::test]
async fn errors_reach_browsers_while_bundles_build() {
    let running = start_hub().await;
    let mut browser = connect_browser(&running, 1).await;

    let (mut reporter, _) = connect_async(running.url()).await.unwrap();
    send_json(
        &mut reporter,
        json!({"type": "bundling", "data": null, "bundleId": "app"}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");

    send_json(
        &mut reporter,
        json!({"type": "bundle_error", "data": {"error": "unexpected token"}}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");

    let error = recv_json(&mut browser).await;
    assert_eq!(error["type"], "bundle_error");
    assert_eq!(error["data"]["error"], "unexpected token");

    // the pending pass still settles afterwards
    send_json(
        &mut reporter,
        json!({"type": "reload", "bundleId": "app", "data": {"x": 2}}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");
    assert_eq!(recv_json(&mut browser).await["type"], "change");

    running.shutdown();
}

#[tokio::test]
async fn unrecognized_frames_leave_the_connection_open() {
    let running = start_hub().await;
    let mut browser = connect_browser(&running, 1).await;

    let (mut reporter, _) = connect_async(running.url()).await.unwrap();
    send_json(&mut reporter, json!({"type": "telemetry"})).await;
    send_json(&mut reporter, json!("not even an object")).await;

    // the connection survived the junk and still processes real frames
    send_json(
        &mut reporter,
        json!({"type": "bundling", "data": null, "bundleId": "app"}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");

    send_json(
        &mut reporter,
        json!({"type": "reload", "bundleId": "app", "data": 1}),
    )
    .await;
    assert_eq!(recv_json(&mut reporter).await["type"], "ack");
    assert_eq!(recv_json(&mut browser).await["data"], json!({"app": 1}));

    running.shutdown();
}

#[tokio::test]
async fn closed_browsers_are_removed_from_the_active_set() {
    let running = start_hub().await;
    let browser = connect_browser(&running, 1).await;

    drop(browser);
    wait_for_clients(&running.hub(), 0).await;

    running.shutdown();
}

#[tokio::test]
async fn remote_notifier_delivers_acknowledged_frames() {
    let running = start_hub().await;
    let mut browser = connect_browser(&running, 1).await;

    let notifier = RemoteNotifier::new(running.url());
    notifier.notify_bundling("external").await;
    notifier.notify_reload("external", empty_payload()).await;

    let change = recv_json(&mut browser).await;
    assert_eq!(change["type"], "change");
    assert_eq!(change["data"]["external"]["entries"], json!(["/src/app.js"]));

    notifier.notify_bundle_error("remote build failed").await;
    let error = recv_json(&mut browser).await;
    assert_eq!(error["data"]["error"], "remote build failed");

    running.shutdown();
}

#[tokio::test]
async fn remote_notifier_survives_an_unreachable_hub() {
    // no hub listening here; delivery fails after retries with a warning,
    // never an error or a panic
    let notifier = RemoteNotifier::new("ws://127.0.0.1:1")
        .with_ack_timeout(Duration::from_millis(100))
        .with_retries(1);
    notifier.notify_bundling("app").await;
}
