pub mod memory;
pub mod pg;

use crate::models::Document;
use memory::MemoryStore;
use pg::PgStore;

/// Errors surfaced by the document store
///
/// These are absorbed at the relay boundary: a failed resolve leaves the
/// session unattached, a failed persist is logged and the session carries on.
#[derive(Debug)]
pub enum StoreError {
    /// The referenced document does not exist and creation was not requested
    NotFound(String),
    /// The persistence layer failed
    Database(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Document '{}' not found", id),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

/// Document store backing the relay
///
/// Postgres in production; the in-memory backend serves deployments without
/// a configured database and the test suite.
pub enum Store {
    Pg(PgStore),
    Memory(MemoryStore),
}

impl Store {
    /// Resolve a document by id, creating it on first reference
    ///
    /// A `None` id means the caller never specified a document: the call is
    /// a no-op yielding `None`. Creation is idempotent — concurrent calls
    /// with the same id always converge on a single stored record, and the
    /// returned document is the stored one (a racing creator gets the
    /// winner's record back, not its own candidate).
    pub async fn resolve_or_create(
        &self,
        document_id: Option<&str>,
        caller_id: Option<&str>,
        document_name: &str,
    ) -> Result<Option<Document>, StoreError> {
        let Some(document_id) = document_id else {
            return Ok(None);
        };
        let doc = match self {
            Store::Pg(pg) => pg.resolve_or_create(document_id, caller_id, document_name).await?,
            Store::Memory(mem) => mem.resolve_or_create(document_id, caller_id, document_name).await,
        };
        Ok(Some(doc))
    }

    /// Overwrite the content of an existing document, last write wins
    pub async fn persist(&self, document_id: &str, content: Vec<u8>) -> Result<(), StoreError> {
        match self {
            Store::Pg(pg) => pg.persist(document_id, content).await,
            Store::Memory(mem) => mem.persist(document_id, content).await,
        }
    }
}
