use tracing::info;

use crate::models::{EditMessage, SendMessage};
use crate::rooms::RoomManager;
use crate::websocket::session::Attachment;

/// Handle EditMessage
///
/// Relays the delta verbatim to every other session in the room. The delta
/// is never inspected, merged or reordered. The edit right computed at
/// attach time is advisory only: it is reported in the `loaded` frame but
/// deliberately not enforced here, so a viewer that sends edits anyway will
/// have them relayed.
pub async fn handle_edit_message(
    edit_msg: &EditMessage,
    attachment: &Attachment,
    connection_id: &str,
    rooms: &RoomManager,
) {

    // Log the edit message
    info!(
        "Edit message received for document {} ({} bytes)",
        attachment.document_id,
        edit_msg.delta.len()
    );

    // Wrap the delta and fan it out to the room, sender excluded
    let relayed_msg = SendMessage::EditRelayed(edit_msg.clone());
    let payload = serde_json::to_string(&relayed_msg).unwrap();

    rooms
        .broadcast_excluding_sender(connection_id, &attachment.document_id, payload)
        .await;
}
