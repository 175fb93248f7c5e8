use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::{error, info};

use super::StoreError;
use crate::models::Document;

/// Postgres-backed document store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool and ensure the schema exists
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Returns
    /// * `Result<Self, SqlxError>` - Connected store or error
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2) // Keep some connections alive
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        // The unique document_id constraint is what makes concurrent
        // creation of the same document converge on one record.
        let schema_sql = r#"
            CREATE TABLE IF NOT EXISTS documents (
                document_id   TEXT PRIMARY KEY,
                owner         TEXT,
                collaborators TEXT[] NOT NULL DEFAULT '{}',
                name          TEXT NOT NULL DEFAULT '',
                content       BYTEA NOT NULL DEFAULT ''::bytea,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
        "#;
        sqlx::query(schema_sql).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Get a document by id, creating it if this is the first reference
    ///
    /// # Arguments
    /// * `document_id` - Client-supplied document identifier
    /// * `caller_id` - Identity of the connecting caller, owner on creation
    /// * `document_name` - Name to use on creation, ignored for existing docs
    ///
    /// # Returns
    /// * `Result<Document, StoreError>` - The stored document
    pub async fn resolve_or_create(
        &self,
        document_id: &str,
        caller_id: Option<&str>,
        document_name: &str,
    ) -> Result<Document, StoreError> {
        // Log pool stats before acquiring connection
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        info!(
            "Resolving document {}. Pool connections: {} idle, {} in use",
            document_id,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );

        // Fast path: the document already exists
        if let Some(doc) = self.find_by_id(document_id).await? {
            return Ok(doc);
        }

        // Try to create it. ON CONFLICT DO NOTHING makes a creation race
        // harmless: the loser gets no row back and re-selects the winner's.
        let insert_sql = r#"
            INSERT INTO documents (document_id, owner, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (document_id) DO NOTHING
            RETURNING document_id, owner, collaborators, name, content, created_at, updated_at;
        "#;
        let inserted = sqlx::query_as::<_, Document>(insert_sql)
            .bind(document_id)
            .bind(caller_id)
            .bind(document_name)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(doc) = inserted {
            info!("Document created: {}", document_id);
            return Ok(doc);
        }

        // Conflict fallback: a concurrent session created it first
        match self.find_by_id(document_id).await? {
            Some(doc) => Ok(doc),
            None => {
                // Created and deleted out from under us; treat as a store fault
                error!("Document {} vanished between insert and re-select", document_id);
                Err(StoreError::NotFound(document_id.to_string()))
            }
        }
    }

    /// Overwrite the content of a document
    ///
    /// # Arguments
    /// * `document_id` - Document identifier
    /// * `content` - Full replacement content blob
    ///
    /// # Returns
    /// * `Result<(), StoreError>` - NotFound if no such document exists
    pub async fn persist(&self, document_id: &str, content: Vec<u8>) -> Result<(), StoreError> {
        let update_sql = r#"
            UPDATE documents
            SET content = $2,
                updated_at = NOW()
            WHERE document_id = $1
            RETURNING document_id;
        "#;
        let row = sqlx::query(update_sql)
            .bind(document_id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(_) => {
                info!("Document content persisted: {}", document_id);
                Ok(())
            }
            None => Err(StoreError::NotFound(document_id.to_string())),
        }
    }

    async fn find_by_id(&self, document_id: &str) -> Result<Option<Document>, SqlxError> {
        let query_sql = r#"
            SELECT document_id, owner, collaborators, name, content, created_at, updated_at
            FROM documents
            WHERE document_id = $1;
        "#;
        sqlx::query_as::<_, Document>(query_sql)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
    }
}
