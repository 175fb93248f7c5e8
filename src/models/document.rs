use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted document record
///
/// The content blob is opaque to the relay: it is whatever serialized editor
/// state the client last saved, and it is only ever replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    /// Client-supplied identifier, unique and immutable after creation
    pub document_id: String,
    /// Identity of the creator; None when an anonymous session created it
    pub owner: Option<String>,
    /// Identities granted the edit right besides the owner
    pub collaborators: Vec<String>,
    /// Human-readable name, fixed at creation
    pub name: String,
    /// Opaque serialized editor state
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Build a fresh record for a first-time identifier
    pub fn new(document_id: String, owner: Option<String>, name: String) -> Self {
        let now = Utc::now();
        Self {
            document_id,
            owner,
            collaborators: Vec::new(),
            name,
            content: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
