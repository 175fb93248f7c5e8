use tracing::{error, info};
use std::sync::Arc;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::broadcast;
use tokio::sync::Mutex;

use crate::auth::policy;
use crate::models::{InitiateMessage, LoadedMessage, SendMessage};
use crate::rooms::{RoomBroadcast, RoomManager};
use crate::store::Store;
use crate::websocket::session::Attachment;

/// Handle InitiateMessage
///
/// Resolves (or creates) the document, computes the caller's edit right,
/// joins the room and answers the initiator with a `loaded` frame carrying
/// the current content. Returns the attachment plus the room receiver on
/// success; `None` leaves the session unattached, which is the outcome for
/// a missing document id as well as for any store failure.
pub async fn handle_initiate_message(
    init_msg: &InitiateMessage,
    store: &Store,
    rooms: &RoomManager,
    sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
) -> Option<(Attachment, broadcast::Receiver<RoomBroadcast>)> {

    // Handle initiate message - Resolve the document and attach
    info!(
        "Initiate message received: document={:?}, caller={:?}",
        init_msg.document_id, init_msg.caller_id
    );

    // Resolve or create the document
    let document = match store
        .resolve_or_create(
            init_msg.document_id.as_deref(),
            init_msg.caller_id.as_deref(),
            &init_msg.document_name,
        )
        .await
    {
        Ok(Some(document)) => document,
        Ok(None) => {
            // Caller never specified a document; the session idles unattached
            info!("Initiate without a document id, session stays unattached");
            return None;
        }
        Err(e) => {
            error!("Failed to resolve document {:?}: {}", init_msg.document_id, e);
            return None;
        }
    };

    // Compute the edit right for this caller
    let can_edit = policy::can_edit(init_msg.caller_id.as_deref(), &document);

    // Join the room before acknowledging, so no peer delta sent after the
    // loaded frame can be missed
    let rx = rooms.join(&document.document_id).await;

    // Send the loaded acknowledgment back to the initiator only
    let loaded_msg = SendMessage::Loaded(LoadedMessage {
        content: document.content.clone(),
        can_edit,
        document_name: document.name.clone(),
    });
    let loaded_msg_text = serde_json::to_string(&loaded_msg).unwrap();

    if sender.lock().await.send(Message::Text(loaded_msg_text)).await.is_err() {
        error!("Failed to send loaded message for document {}", document.document_id);
        drop(rx);
        rooms.leave(&document.document_id).await;
        return None;
    }

    Some((
        Attachment {
            document_id: document.document_id,
            can_edit,
            document_name: document.name,
        },
        rx,
    ))
}
