//! End-to-end tests of the sync relay using a real WebSocket client.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use gcnote::api::build_app;
use gcnote::app_state::AppState;
use gcnote::config::AppConfig;
use gcnote::storage::MemoryStore;
use gcnote::sync::SyncEngine;
use gcnote::sync::protocol::seed_frame;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn listen() -> (tokio::net::TcpListener, String) {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    (listener, addr.to_string())
}

/// Boots a bare sync listener and returns its address.
async fn boot_sync(engine: Arc<SyncEngine>) -> String {
    let (listener, addr) = listen().await;
    tokio::spawn(gcnote::sync::server::serve(listener, engine));
    addr
}

async fn connect(url: &str) -> WsStream {
    let Ok(Ok((ws, _))) = timeout(TIMEOUT, connect_async(url)).await else {
        panic!("connect to {url} failed");
    };
    ws
}

async fn next_binary(ws: &mut WsStream) -> Vec<u8> {
    loop {
        match timeout(TIMEOUT, ws.next()).await {
            Ok(Some(Ok(Message::Binary(frame)))) => return frame.to_vec(),
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            other => panic!("expected a binary frame, got {other:?}"),
        }
    }
}

async fn assert_silent(ws: &mut WsStream) {
    assert!(
        timeout(Duration::from_millis(200), ws.next()).await.is_err(),
        "unexpected frame"
    );
}

async fn send(ws: &mut WsStream, frame: &[u8]) {
    let Ok(()) = ws.send(Message::binary(frame.to_vec())).await else {
        panic!("send failed");
    };
}

/// Waits until `engine` counts `clients` connected clients.
async fn wait_for_clients(engine: &SyncEngine, clients: usize) {
    let waited = timeout(TIMEOUT, async {
        while engine.client_count().await != clients {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "expected {clients} clients");
}

#[tokio::test]
async fn frames_are_relayed_within_a_room() {
    let engine = Arc::new(SyncEngine::new(64, None));
    let addr = boot_sync(Arc::clone(&engine)).await;

    let mut alice = connect(&format!("ws://{addr}/doc-1")).await;
    let mut bob = connect(&format!("ws://{addr}/doc-1")).await;
    let mut eve = connect(&format!("ws://{addr}/doc-2")).await;
    wait_for_clients(&engine, 3).await;

    send(&mut alice, &[0, 2, 3, 9, 9, 9]).await;
    assert_eq!(next_binary(&mut bob).await, vec![0, 2, 3, 9, 9, 9]);
    send(&mut bob, &[1, 7]).await;
    assert_eq!(next_binary(&mut alice).await, vec![1, 7]);

    assert_silent(&mut eve).await;
    assert_silent(&mut alice).await;

    // A late joiner starts from the latest document state.
    let mut carol = connect(&format!("ws://{addr}/doc-1")).await;
    assert_eq!(next_binary(&mut carol).await, vec![0, 2, 3, 9, 9, 9]);
}

#[tokio::test]
async fn leaving_keeps_the_room() {
    let engine = Arc::new(SyncEngine::new(64, None));
    let addr = boot_sync(Arc::clone(&engine)).await;

    let mut first = connect(&format!("ws://{addr}/")).await;
    wait_for_clients(&engine, 1).await;
    send(&mut first, &[0, 1, 0]).await;
    let Ok(()) = first.close(None).await else {
        panic!("close failed");
    };
    wait_for_clients(&engine, 0).await;
    assert!(engine.room("default").await.is_some());

    let mut second = connect(&format!("ws://{addr}")).await;
    assert_eq!(next_binary(&mut second).await, vec![0, 1, 0]);
}

async fn post(client: &reqwest::Client, url: String, token: Option<&str>, body: Value) -> Value {
    let mut request = client.post(url).json(&body);
    if let Some(token) = token {
        request = request.header("token", token);
    }
    let Ok(response) = request.send().await else {
        panic!("request failed");
    };
    let Ok(body) = response.json::<Value>().await else {
        panic!("body is not JSON");
    };
    body
}

#[tokio::test]
async fn share_rooms_follow_the_share() {
    let Ok(data) = tempfile::tempdir() else {
        panic!("tempdir failed");
    };
    let config = AppConfig::for_data_dir(data.path());
    let Ok(state) = AppState::build(config, Arc::new(MemoryStore::new())).await else {
        panic!("state failed");
    };
    let engine = Arc::clone(&state.sync);
    let sync_addr = boot_sync(Arc::clone(&engine)).await;
    let (listener, api_addr) = listen().await;
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_app(state)).await;
    });

    let client = reqwest::Client::new();
    let api = |path: &str| format!("http://{api_addr}{path}");
    post(
        &client,
        api("/user/register"),
        None,
        json!({"username": "sam", "email": "sam@example.com", "password": "pw"}),
    )
    .await;
    let login = post(&client, api("/user/login"), None, json!({"username": "sam", "password": "pw"})).await;
    let Some(token) = login["data"].as_str() else {
        panic!("no token in {login}");
    };
    let index = post(&client, api("/index/create_index"), Some(token), json!({"index_name": "kb"})).await;
    let index_id = index["data"]["index_id"].clone();
    let file = post(
        &client,
        api("/index/create_file"),
        Some(token),
        json!({"index_id": index_id, "kb_file_name": "live"}),
    )
    .await;
    let Some(file_id) = file["data"]["kb_file_id"].as_str().map(ToString::to_string) else {
        panic!("no file id in {file}");
    };
    let share = post(&client, api("/share/create"), Some(token), json!({"kb_file_id": file_id})).await;
    assert_eq!(share["code"], 0, "{share}");

    // Both listeners reach the same room, seeded from the (empty) snapshot.
    let mut via_api = connect(&format!("ws://{api_addr}/share/ws/{file_id}")).await;
    assert_eq!(next_binary(&mut via_api).await, seed_frame("").to_vec());
    let mut via_sync = connect(&format!("ws://{sync_addr}/{file_id}")).await;
    assert_eq!(next_binary(&mut via_sync).await, seed_frame("").to_vec());

    send(&mut via_sync, &[1, 42]).await;
    assert_eq!(next_binary(&mut via_api).await, vec![1, 42]);

    let deleted = post(&client, api("/share/delete"), Some(token), json!({"share_file_id": file_id})).await;
    assert_eq!(deleted["code"], 0);

    for ws in [&mut via_api, &mut via_sync] {
        match timeout(TIMEOUT, ws.next()).await {
            Ok(None | Some(Ok(Message::Close(_))) | Some(Err(_))) => {}
            other => panic!("socket should close, got {other:?}"),
        }
    }
    assert_eq!(engine.room_count().await, 0);
}
