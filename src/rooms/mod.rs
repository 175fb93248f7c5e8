use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info};

/// Capacity of each room's broadcast channel. A lagging receiver loses the
/// oldest messages rather than blocking the sender.
const ROOM_CHANNEL_CAPACITY: usize = 100;

/// A message fanned out to every session in a room
///
/// The payload is the pre-serialized frame to forward; `sender_id` is the
/// connection id of the originating session so receivers can suppress the
/// echo back to the sender.
#[derive(Debug, Clone)]
pub struct RoomBroadcast {
    pub sender_id: String,
    pub payload: String,
}

/// Tracks which live sessions are attached to which document
///
/// One broadcast channel per document id. Joining subscribes to the channel;
/// leaving drops the receiver and prunes the room once the last session is
/// gone. Owned by the application state and injected into the relay, never
/// accessed as a global.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, broadcast::Sender<RoomBroadcast>>>,
}

impl RoomManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
        })
    }

    /// Join the room for a document, creating the room if it does not exist
    ///
    /// Returns the receiver for everything broadcast to the room from this
    /// point on. Earlier broadcasts are not replayed.
    pub async fn join(&self, document_id: &str) -> broadcast::Receiver<RoomBroadcast> {
        let mut rooms = self.rooms.write().await;
        let sender = rooms.entry(document_id.to_string()).or_insert_with(|| {
            info!("Creating room for document {}", document_id);
            let (bc, _rx) = broadcast::channel::<RoomBroadcast>(ROOM_CHANNEL_CAPACITY);
            bc
        });
        sender.subscribe()
    }

    /// Deliver a payload to every session in the room except the sender
    ///
    /// Best-effort: sessions that disconnect mid-broadcast simply miss the
    /// message. Delivery order across recipients is unspecified; per-sender
    /// order is preserved by the underlying channel.
    pub async fn broadcast_excluding_sender(
        &self,
        sender_id: &str,
        document_id: &str,
        payload: String,
    ) {
        let rooms = self.rooms.read().await;
        let Some(bc) = rooms.get(document_id) else {
            debug!("Broadcast to unknown room {} dropped", document_id);
            return;
        };

        let msg = RoomBroadcast {
            sender_id: sender_id.to_string(),
            payload,
        };
        // send only fails when no receiver exists, i.e. everyone (including
        // the sender's own forward task) already left
        if let Err(e) = bc.send(msg) {
            error!("Failed to broadcast for document {}: {}", document_id, e);
        }
    }

    /// Drop the room entry once its last session has left
    ///
    /// The caller drops its receiver before calling this; a room whose
    /// channel still has subscribers is kept. No-op for unknown rooms.
    pub async fn leave(&self, document_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(bc) = rooms.get(document_id) {
            if bc.receiver_count() == 0 {
                rooms.remove(document_id);
                info!("Room for document {} is empty, pruned", document_id);
            }
        }
    }

    /// Number of rooms with at least one attached session
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Number of live sessions across all rooms
    pub async fn connection_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.values().map(|bc| bc.receiver_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_peers_but_not_sender() {
        let rooms = RoomManager::new();
        let mut rx_a = rooms.join("doc1").await;
        let mut rx_b = rooms.join("doc1").await;

        rooms
            .broadcast_excluding_sender("conn-a", "doc1", "delta".to_string())
            .await;

        // Both receivers get the raw broadcast; echo suppression happens in
        // the per-connection forward loop by comparing sender_id.
        let got_b = rx_b.recv().await.unwrap();
        assert_eq!(got_b.payload, "delta");
        assert_eq!(got_b.sender_id, "conn-a");

        let got_a = rx_a.recv().await.unwrap();
        assert_eq!(got_a.sender_id, "conn-a");
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let rooms = RoomManager::new();
        let _rx_one = rooms.join("doc1").await;
        let mut rx_other = rooms.join("doc2").await;

        rooms
            .broadcast_excluding_sender("conn-a", "doc1", "delta".to_string())
            .await;

        assert!(matches!(
            rx_other.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn broadcast_to_unknown_room_is_a_noop() {
        let rooms = RoomManager::new();
        rooms
            .broadcast_excluding_sender("conn-a", "nope", "delta".to_string())
            .await;
        assert_eq!(rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn leave_prunes_empty_rooms_only() {
        let rooms = RoomManager::new();
        let rx_a = rooms.join("doc1").await;
        let rx_b = rooms.join("doc1").await;
        assert_eq!(rooms.room_count().await, 1);
        assert_eq!(rooms.connection_count().await, 2);

        drop(rx_a);
        rooms.leave("doc1").await;
        // rx_b still subscribed, room survives
        assert_eq!(rooms.room_count().await, 1);

        drop(rx_b);
        rooms.leave("doc1").await;
        assert_eq!(rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn departed_session_receives_nothing_further() {
        let rooms = RoomManager::new();
        let rx_a = rooms.join("doc1").await;
        let _rx_b = rooms.join("doc1").await;

        drop(rx_a);
        rooms.leave("doc1").await;

        rooms
            .broadcast_excluding_sender("conn-b", "doc1", "delta".to_string())
            .await;
        // Nothing to assert on rx_a itself (it is gone); the room still
        // only counts the surviving session.
        assert_eq!(rooms.connection_count().await, 1);
    }

    #[tokio::test]
    async fn per_sender_order_is_preserved() {
        let rooms = RoomManager::new();
        let mut rx_b = rooms.join("doc1").await;

        for i in 0..5 {
            rooms
                .broadcast_excluding_sender("conn-a", "doc1", format!("delta-{}", i))
                .await;
        }
        for i in 0..5 {
            assert_eq!(rx_b.recv().await.unwrap().payload, format!("delta-{}", i));
        }
    }
}
