//! End-to-end tests: boot the real app on a free port and talk to it with
//! tokio-tungstenite clients.

use colabri_presence::config::Config;
use colabri_presence::routes::create_app;
use colabri_presence::state::AppState;
use colabri_presence::ws::faults::FaultKind;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a server on a free port, return its state and address.
async fn start_test_server() -> (Arc<AppState>, SocketAddr) {
    start_server_with(Config::default()).await
}

async fn start_server_with(config: Config) -> (Arc<AppState>, SocketAddr) {
    let state = AppState::new(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, addr)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn send(ws: &mut Client, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next text frame as JSON, skipping control frames.
async fn recv_event(ws: &mut Client) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(_) = msg {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

async fn expect_silence(ws: &mut Client) {
    let next = timeout(Duration::from_millis(150), ws.next()).await;
    assert!(next.is_err(), "expected no event, got {:?}", next);
}

async fn join(ws: &mut Client, document_id: &str, user_id: &str, user_name: &str) -> Value {
    send(
        ws,
        json!({"type": "join-document", "documentId": document_id, "userId": user_id, "userName": user_name}),
    )
    .await;
    let snapshot = recv_event(ws).await;
    assert_eq!(snapshot["type"], "presence-snapshot");
    snapshot
}

#[tokio::test]
async fn join_then_relay_change() {
    let (_state, addr) = start_test_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    let snapshot = join(&mut alice, "doc-1", "A", "Alice").await;
    assert_eq!(snapshot["activeUsers"].as_array().unwrap().len(), 1);

    let snapshot = join(&mut bob, "doc-1", "B", "Bob").await;
    let users: Vec<_> = snapshot["activeUsers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["userId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(users, vec!["A", "B"]);

    let joined = recv_event(&mut alice).await;
    assert_eq!(joined["type"], "user-joined");
    assert_eq!(joined["userId"], "B");
    assert_eq!(joined["userName"], "Bob");

    send(
        &mut alice,
        json!({"type": "document-change", "documentId": "doc-1", "changes": {"patch": "x"}, "userId": "A"}),
    )
    .await;

    let update = recv_event(&mut bob).await;
    assert_eq!(update["type"], "document-updated");
    assert_eq!(update["changes"], json!({"patch": "x"}));
    assert_eq!(update["userId"], "A");
    assert!(update["timestamp"].as_str().unwrap().ends_with('Z'));
    expect_silence(&mut alice).await;
}

#[tokio::test]
async fn dropped_socket_triggers_user_left() {
    let (state, addr) = start_test_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    join(&mut alice, "doc-1", "A", "Alice").await;
    join(&mut bob, "doc-1", "B", "Bob").await;
    recv_event(&mut alice).await;

    // no leave-document, no close frame
    drop(alice);

    let left = recv_event(&mut bob).await;
    assert_eq!(left["type"], "user-left");
    assert_eq!(left["userId"], "A");
    assert_eq!(left["activeUsers"].as_array().unwrap().len(), 1);

    let snapshot = state.rooms.snapshot("doc-1");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.active_users[0].user_id, "B");
}

#[tokio::test]
async fn garbage_frames_do_not_close_the_connection() {
    let (state, addr) = start_test_server().await;
    let mut alice = connect(addr).await;

    alice.send(Message::Text("definitely not json".into())).await.unwrap();
    send(&mut alice, json!({"type": "document-change", "documentId": "doc-1", "changes": {}})).await;
    send(&mut alice, json!({"type": "ping"})).await;

    let pong = recv_event(&mut alice).await;
    assert_eq!(pong["type"], "pong");
    assert!(pong["date"].is_string());

    let faults = state.faults.snapshot();
    assert_eq!(faults.malformed_frame, 1);
    assert_eq!(faults.not_a_member, 1);
}

#[tokio::test]
async fn cursor_moves_arrive_in_send_order() {
    let (_state, addr) = start_test_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    join(&mut alice, "doc-1", "A", "Alice").await;
    join(&mut bob, "doc-1", "B", "Bob").await;
    recv_event(&mut alice).await;

    for line in 0..20 {
        send(
            &mut alice,
            json!({"type": "cursor-position", "documentId": "doc-1", "position": {"line": line}, "userId": "A", "userName": "Alice"}),
        )
        .await;
    }

    for line in 0..20 {
        let event = recv_event(&mut bob).await;
        assert_eq!(event["type"], "cursor-updated");
        assert_eq!(event["position"]["line"], line);
        assert_eq!(event["userName"], "Alice");
    }
}

#[tokio::test]
async fn explicit_leave_closes_empty_room() {
    let (state, addr) = start_test_server().await;
    let mut alice = connect(addr).await;
    join(&mut alice, "doc-3", "A", "Alice").await;
    assert_eq!(state.rooms.snapshot("doc-3").len(), 1);

    send(&mut alice, json!({"type": "leave-document", "documentId": "doc-3"})).await;

    // leave produces no reply; wait until the server has processed it
    for _ in 0..50 {
        if state.rooms.snapshot("doc-3").is_empty() {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(state.rooms.snapshot("doc-3").is_empty());
    assert_eq!(state.rooms.stats().rooms, 0);
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn client_that_stops_reading_is_evicted() {
    let config = Config::from_pairs(vec![(
        "OUTBOUND_QUEUE_CAPACITY".to_string(),
        "4".to_string(),
    )])
    .unwrap();
    let (state, addr) = start_server_with(config).await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    join(&mut alice, "doc-1", "A", "Alice").await;
    join(&mut bob, "doc-1", "B", "Bob").await;
    recv_event(&mut alice).await;

    // bob never reads again; large frames fill the socket buffers and then his queue
    let blob = "x".repeat(64 * 1024);
    for seq in 0..400 {
        send(
            &mut alice,
            json!({"type": "document-change", "documentId": "doc-1", "changes": {"seq": seq, "blob": blob}}),
        )
        .await;
        if state.faults.count(FaultKind::QueueOverflow) > 0 {
            break;
        }
    }

    let left = recv_event(&mut alice).await;
    assert_eq!(left["type"], "user-left");
    assert_eq!(left["userId"], "B");
    assert_eq!(left["activeUsers"].as_array().unwrap().len(), 1);

    assert_eq!(state.faults.count(FaultKind::QueueOverflow), 1);
    assert_eq!(state.registry.len(), 1);
    assert_eq!(state.rooms.snapshot("doc-1").len(), 1);
    drop(bob);
}
