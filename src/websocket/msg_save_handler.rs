use tracing::{error, info};

use crate::models::SaveMessage;
use crate::store::Store;
use crate::websocket::session::Attachment;

/// Handle SaveMessage
///
/// Persists the full replacement content for the attached document, last
/// write wins. No broadcast. A failed persist is logged and absorbed: the
/// deltas peers already received stay valid, and the session keeps editing.
pub async fn handle_save_message(save_msg: SaveMessage, attachment: &Attachment, store: &Store) {

    // Log the save message
    info!(
        "Save message received for document {} ({} bytes)",
        attachment.document_id,
        save_msg.content.len()
    );

    // Persist the content - Overwrite wholesale
    if let Err(e) = store.persist(&attachment.document_id, save_msg.content).await {
        error!("Failed to persist document {}: {}", attachment.document_id, e);
    }
}
