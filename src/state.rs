use std::sync::Arc;

use crate::rooms::RoomManager;
use crate::store::Store;

/// Shared application state, injected into every handler
pub struct AppState {
    pub store: Store,
    pub rooms: Arc<RoomManager>,
}

impl AppState {
    pub fn new(store: Store) -> Arc<Self> {
        Arc::new(Self {
            store,
            rooms: RoomManager::new(),
        })
    }
}
