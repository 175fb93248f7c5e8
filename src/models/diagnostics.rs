use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for the diagnostics endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// Number of live relay sessions across all rooms
    pub n_conn: u32,
    /// Number of rooms with at least one attached session
    pub n_rooms: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
