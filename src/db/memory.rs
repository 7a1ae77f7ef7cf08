use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::models::{ChatMessage, Document};
use crate::types::{AppError, AppResult};

/// Process-local repository used when no database is configured, and by tests.
/// Nothing survives a restart.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    documents: HashMap<Uuid, Document>,
    // Insertion order doubles as the tie-breaker for equal timestamps.
    messages: Vec<ChatMessage>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert_document(&self, document: &Document) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.documents.contains_key(&document.id) {
            return Err(AppError::Internal(format!("duplicate document id {}", document.id)));
        }
        tables.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> AppResult<Option<Document>> {
        Ok(self.tables.read().await.documents.get(&id).cloned())
    }

    async fn list_documents(&self) -> AppResult<Vec<Document>> {
        let mut documents: Vec<Document> = self.tables.read().await.documents.values().cloned().collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    async fn delete_document(&self, id: Uuid) -> AppResult<Option<(Document, u64)>> {
        let mut tables = self.tables.write().await;
        let Some(document) = tables.documents.remove(&id) else {
            return Ok(None);
        };

        let before = tables.messages.len();
        tables.messages.retain(|m| m.document_id != id);
        let removed = (before - tables.messages.len()) as u64;

        Ok(Some((document, removed)))
    }

    async fn insert_message(&self, message: &ChatMessage) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.documents.contains_key(&message.document_id) {
            return Err(AppError::NotFound(format!("Document {}", message.document_id)));
        }
        tables.messages.push(message.clone());
        Ok(())
    }

    async fn messages_for_document(&self, document_id: Uuid) -> AppResult<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .tables
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.document_id == document_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
