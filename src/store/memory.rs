use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

use super::StoreError;
use crate::models::Document;

/// In-process document store
///
/// Backs deployments without a configured database and the test suite. A
/// single mutex over the map serializes creation per identifier, so the
/// get-or-create race cannot mint two records for one id.
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Get a document by id, creating it if this is the first reference
    pub async fn resolve_or_create(
        &self,
        document_id: &str,
        caller_id: Option<&str>,
        document_name: &str,
    ) -> Document {
        let mut documents = self.documents.lock().await;
        documents
            .entry(document_id.to_string())
            .or_insert_with(|| {
                info!("Document created: {}", document_id);
                Document::new(
                    document_id.to_string(),
                    caller_id.map(|c| c.to_string()),
                    document_name.to_string(),
                )
            })
            .clone()
    }

    /// Overwrite the content of a document
    pub async fn persist(&self, document_id: &str, content: Vec<u8>) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().await;
        match documents.get_mut(document_id) {
            Some(doc) => {
                doc.content = content;
                doc.updated_at = chrono::Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound(document_id.to_string())),
        }
    }

}
