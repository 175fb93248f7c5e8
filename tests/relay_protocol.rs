use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use vantyse_doc::models::{
    EditMessage, InitiateMessage, ReceivedMessage, SaveMessage, SendMessage,
};
use vantyse_doc::state::AppState;
use vantyse_doc::store::{memory::MemoryStore, Store};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bind the relay on an ephemeral port and return its ws URL plus the state
async fn spawn_relay() -> (String, Arc<AppState>) {
    let app_state = AppState::new(Store::Memory(MemoryStore::new()));
    let app = vantyse_doc::app(app_state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{}/ws", addr), app_state)
}

async fn connect(url: &str) -> WsClient {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn send(ws: &mut WsClient, msg: &ReceivedMessage) {
    let text = serde_json::to_string(msg).unwrap();
    ws.send(Message::text(text)).await.unwrap();
}

async fn recv(ws: &mut WsClient) -> SendMessage {
    loop {
        let frame = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Assert that no frame arrives within a grace period
async fn assert_silent(ws: &mut WsClient) {
    let got = timeout(Duration::from_millis(300), ws.next()).await;
    assert!(got.is_err(), "expected silence, got {:?}", got);
}

fn initiate(document_id: Option<&str>, caller_id: Option<&str>, name: &str) -> ReceivedMessage {
    ReceivedMessage::Initiate(InitiateMessage {
        document_id: document_id.map(|s| s.to_string()),
        caller_id: caller_id.map(|s| s.to_string()),
        document_name: name.to_string(),
    })
}

fn edit(delta: &[u8]) -> ReceivedMessage {
    ReceivedMessage::Edit(EditMessage { delta: delta.to_vec() })
}

fn save(content: &[u8]) -> ReceivedMessage {
    ReceivedMessage::Save(SaveMessage { content: content.to_vec() })
}

/// Poll the store until the document content matches, or fail
async fn await_persisted(app_state: &AppState, document_id: &str, expected: &[u8]) {
    for _ in 0..100 {
        let doc = app_state
            .store
            .resolve_or_create(Some(document_id), None, "")
            .await
            .unwrap()
            .unwrap();
        if doc.content == expected {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("document {} never reached expected content", document_id);
}

#[tokio::test]
async fn two_clients_create_attach_relay_and_save() {
    let (url, app_state) = spawn_relay().await;

    // client1 creates doc1 and gets the edit right as its owner
    let mut alice = connect(&url).await;
    send(&mut alice, &initiate(Some("doc1"), Some("alice"), "My Doc")).await;
    let SendMessage::Loaded(loaded) = recv(&mut alice).await else {
        panic!("expected loaded");
    };
    assert!(loaded.content.is_empty());
    assert!(loaded.can_edit);
    assert_eq!(loaded.document_name, "My Doc");

    // client2 attaches to the existing doc; not owner, not collaborator
    let mut bob = connect(&url).await;
    send(&mut bob, &initiate(Some("doc1"), Some("bob"), "ignored")).await;
    let SendMessage::Loaded(loaded) = recv(&mut bob).await else {
        panic!("expected loaded");
    };
    assert!(loaded.content.is_empty());
    assert!(!loaded.can_edit);
    assert_eq!(loaded.document_name, "My Doc");

    // alice's delta reaches bob exactly once and never echoes back
    send(&mut alice, &edit(b"insert x")).await;
    let SendMessage::EditRelayed(relayed) = recv(&mut bob).await else {
        panic!("expected edit-relayed");
    };
    assert_eq!(relayed.delta, b"insert x");
    assert_silent(&mut alice).await;
    assert_silent(&mut bob).await;

    // alice saves; the store ends up holding the new content
    send(&mut alice, &save(b"x")).await;
    await_persisted(&app_state, "doc1", b"x").await;
}

#[tokio::test]
async fn edit_before_initiate_is_ignored() {
    let (url, _app_state) = spawn_relay().await;

    let mut alice = connect(&url).await;
    let mut peer = connect(&url).await;
    send(&mut peer, &initiate(Some("doc1"), Some("peer"), "Doc")).await;
    recv(&mut peer).await; // loaded

    // Unattached session sends an edit: no broadcast, no crash
    send(&mut alice, &edit(b"too early")).await;
    assert_silent(&mut peer).await;

    // The session can still attach afterwards
    send(&mut alice, &initiate(Some("doc1"), Some("alice"), "Doc")).await;
    assert!(matches!(recv(&mut alice).await, SendMessage::Loaded(_)));
}

#[tokio::test]
async fn save_before_initiate_is_ignored() {
    let (url, app_state) = spawn_relay().await;

    let mut alice = connect(&url).await;
    send(&mut alice, &save(b"orphan")).await;
    assert_silent(&mut alice).await;

    // Nothing was created or written
    sleep(Duration::from_millis(100)).await;
    assert_eq!(app_state.rooms.room_count().await, 0);
}

#[tokio::test]
async fn duplicate_initiate_is_ignored() {
    let (url, _app_state) = spawn_relay().await;

    let mut alice = connect(&url).await;
    send(&mut alice, &initiate(Some("doc1"), Some("alice"), "Doc")).await;
    assert!(matches!(recv(&mut alice).await, SendMessage::Loaded(_)));

    // Second initiate on the same session: no second loaded, no rebind
    send(&mut alice, &initiate(Some("doc2"), Some("alice"), "Other")).await;
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn initiate_without_document_id_stays_unattached() {
    let (url, app_state) = spawn_relay().await;

    let mut alice = connect(&url).await;
    send(&mut alice, &initiate(None, Some("alice"), "Doc")).await;
    assert_silent(&mut alice).await;
    assert_eq!(app_state.rooms.room_count().await, 0);

    // Further signals on the dangling session stay inert
    send(&mut alice, &edit(b"nope")).await;
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn disconnect_removes_session_from_room() {
    let (url, app_state) = spawn_relay().await;

    let mut alice = connect(&url).await;
    send(&mut alice, &initiate(Some("doc1"), Some("alice"), "Doc")).await;
    recv(&mut alice).await;

    let mut bob = connect(&url).await;
    send(&mut bob, &initiate(Some("doc1"), Some("bob"), "Doc")).await;
    recv(&mut bob).await;

    // bob leaves; the room shrinks to one session
    bob.close(None).await.unwrap();
    for _ in 0..100 {
        if app_state.rooms.connection_count().await == 1 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(app_state.rooms.connection_count().await, 1);

    // alice keeps relaying into the room without error
    send(&mut alice, &edit(b"after leave")).await;
    assert_silent(&mut alice).await;

    // last one out prunes the room
    alice.close(None).await.unwrap();
    for _ in 0..100 {
        if app_state.rooms.room_count().await == 0 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(app_state.rooms.room_count().await, 0);
}

#[tokio::test]
async fn rooms_do_not_leak_deltas_across_documents() {
    let (url, _app_state) = spawn_relay().await;

    let mut alice = connect(&url).await;
    send(&mut alice, &initiate(Some("doc1"), Some("alice"), "One")).await;
    recv(&mut alice).await;

    let mut carol = connect(&url).await;
    send(&mut carol, &initiate(Some("doc2"), Some("carol"), "Two")).await;
    recv(&mut carol).await;

    send(&mut alice, &edit(b"doc1 only")).await;
    assert_silent(&mut carol).await;
}

#[tokio::test]
async fn saved_content_reaches_later_sessions() {
    let (url, app_state) = spawn_relay().await;

    let mut alice = connect(&url).await;
    send(&mut alice, &initiate(Some("doc1"), Some("alice"), "Doc")).await;
    recv(&mut alice).await;
    send(&mut alice, &save(b"xyz")).await;
    await_persisted(&app_state, "doc1", b"xyz").await;

    // A session attaching after the save loads the persisted content
    let mut bob = connect(&url).await;
    send(&mut bob, &initiate(Some("doc1"), Some("bob"), "ignored")).await;
    let SendMessage::Loaded(loaded) = recv(&mut bob).await else {
        panic!("expected loaded");
    };
    assert_eq!(loaded.content, b"xyz");
}

#[tokio::test]
async fn deltas_from_one_sender_arrive_in_order() {
    let (url, _app_state) = spawn_relay().await;

    let mut alice = connect(&url).await;
    send(&mut alice, &initiate(Some("doc1"), Some("alice"), "Doc")).await;
    recv(&mut alice).await;

    let mut bob = connect(&url).await;
    send(&mut bob, &initiate(Some("doc1"), Some("bob"), "Doc")).await;
    recv(&mut bob).await;

    for i in 0..10u8 {
        send(&mut alice, &edit(&[i])).await;
    }
    for i in 0..10u8 {
        let SendMessage::EditRelayed(relayed) = recv(&mut bob).await else {
            panic!("expected edit-relayed");
        };
        assert_eq!(relayed.delta, vec![i]);
    }
}
