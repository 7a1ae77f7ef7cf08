// Persistence for documents and their chat history

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;
use crate::config::DatabaseConfig;
use crate::models::{ChatMessage, Document};
use crate::types::AppResult;
use anyhow::Result;

pub use memory::*;
pub use operations::*;
pub use pool::*;

pub mod memory;
pub mod operations;
pub mod pool;

/// Storage contract for the two persisted entities.
///
/// Deleting a document removes its messages with it.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn insert_document(&self, document: &Document) -> AppResult<()>;

    async fn get_document(&self, id: Uuid) -> AppResult<Option<Document>>;

    /// All documents, newest upload first.
    async fn list_documents(&self) -> AppResult<Vec<Document>>;

    /// Returns the removed document and the number of messages removed with it.
    async fn delete_document(&self, id: Uuid) -> AppResult<Option<(Document, u64)>>;

    async fn insert_message(&self, message: &ChatMessage) -> AppResult<()>;

    /// Messages of one document, oldest first.
    async fn messages_for_document(&self, document_id: Uuid) -> AppResult<Vec<ChatMessage>>;

    async fn health_check(&self) -> AppResult<()>;

    fn backend_name(&self) -> &'static str;
}

pub async fn create_pool(config: &DatabaseConfig, url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(url)
        .await?;

    // Test connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await?;

    Ok(pool)
}
