
use std::sync::Arc;
use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use futures_util::{StreamExt, SinkExt};
use futures_util::stream::SplitSink;
use uuid::Uuid;

use crate::models::ReceivedMessage;
use crate::rooms::RoomBroadcast;
use crate::state::AppState;
use crate::websocket::msg_edit_handler::handle_edit_message;
use crate::websocket::msg_initiate_handler::handle_initiate_message;
use crate::websocket::msg_save_handler::handle_save_message;
use crate::websocket::session::{Session, SessionState};

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
///
/// Runs one session's state machine: every inbound frame is dispatched
/// through a single match on the parsed message, and the current session
/// state decides whether the signal is acted on or ignored.
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {

    // Generate unique connection ID to identify this client
    let connection_id = Uuid::new_v4().to_string();

    // Log connection establishment
    info!("WebSocket connection established with connection_id: {}", connection_id);

    // Split the socket into sender and receiver
    let (sender, mut receiver) = socket.split();

    // As the sender is shared with the room-forward task, wrap it in an Arc and Mutex
    let sender = Arc::new(tokio::sync::Mutex::new(sender));

    let mut session = Session::new(connection_id.clone());

    // Forwards room broadcasts to this client once the session is attached
    let mut forward_task: Option<JoinHandle<()>> = None;

    // Listen for incoming messages; only text frames carry protocol signals,
    // everything else is skipped and a closed stream ends the loop
    while let Some(Ok(Message::Text(msg))) = receiver.next().await {

        // Parse the incoming message as JSON
        let received_msg: ReceivedMessage = match serde_json::from_str(&msg) {
            Ok(received_msg) => received_msg,
            Err(e) => {
                error!("Failed to parse message on connection {}: {}", connection_id, e);
                continue;
            }
        };

        // Handle different message types
        match received_msg {
            ReceivedMessage::Initiate(init_msg) => {
                // At most one attach per session
                if session.is_attached() {
                    warn!("Duplicate initiate on connection {} ignored", connection_id);
                    continue;
                }
                let attached = handle_initiate_message(
                    &init_msg,
                    &app_state.store,
                    &app_state.rooms,
                    &sender,
                )
                .await;
                if let Some((attachment, rx)) = attached {
                    forward_task = Some(spawn_room_forward(rx, connection_id.clone(), sender.clone()));
                    info!(
                        "Connection {} attached to document {} (can_edit={})",
                        connection_id, attachment.document_id, attachment.can_edit
                    );
                    session.state = SessionState::Attached(attachment);
                }
            }
            ReceivedMessage::Edit(edit_msg) => {
                let Some(attachment) = session.attachment() else {
                    debug!("Edit before attach on connection {} ignored", connection_id);
                    continue;
                };
                handle_edit_message(&edit_msg, attachment, &session.connection_id, &app_state.rooms).await;
            }
            ReceivedMessage::Save(save_msg) => {
                let Some(attachment) = session.attachment() else {
                    debug!("Save before attach on connection {} ignored", connection_id);
                    continue;
                };
                handle_save_message(save_msg, attachment, &app_state.store).await;
            }
        }
    }

    // Disconnect: stop forwarding first so the room receiver is dropped,
    // then let the room manager prune the room if this was the last session
    if let Some(task) = forward_task {
        task.abort();
        let _ = task.await;
    }
    if let SessionState::Attached(attachment) = &session.state {
        app_state.rooms.leave(&attachment.document_id).await;
    }
    session.state = SessionState::Closed;

    info!("WebSocket connection {} terminated", connection_id);
}

/// Forward room broadcasts to this client, suppressing its own echo
fn spawn_room_forward(
    mut rx: broadcast::Receiver<RoomBroadcast>,
    connection_id: String,
    sender: Arc<tokio::sync::Mutex<SplitSink<WebSocket, Message>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(broadcast_msg) => {
                    // Skip messages from this connection to prevent echo
                    if broadcast_msg.sender_id == connection_id {
                        continue;
                    }
                    if sender.lock().await.send(Message::Text(broadcast_msg.payload)).await.is_err() {
                        break;
                    }
                }
                // A lagged receiver lost old deltas; keep forwarding new ones
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Connection {} lagged, {} broadcasts dropped", connection_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
