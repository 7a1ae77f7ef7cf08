use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::Repository;
use crate::models::{ChatMessage, Citation, Document, MessageRole};
use crate::types::{AppError, AppResult};

/// Postgres-backed repository. Queries are checked at runtime so the crate
/// builds without a live database.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    id: Uuid,
    document_id: Uuid,
    message_type: String,
    content: String,
    timestamp: DateTime<Utc>,
    citations: Json<Vec<Citation>>,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = AppError;

    fn try_from(row: ChatMessageRow) -> AppResult<Self> {
        let role: MessageRole = row.message_type.parse().map_err(AppError::Internal)?;
        Ok(ChatMessage {
            id: row.id,
            document_id: row.document_id,
            role,
            content: row.content,
            timestamp: row.timestamp,
            citations: row.citations.0,
        })
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn insert_document(&self, document: &Document) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, title, file, uploaded_at, page_count, text_content)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.file)
        .bind(document.uploaded_at)
        .bind(document.page_count)
        .bind(&document.text_content)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> AppResult<Option<Document>> {
        let document = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(document)
    }

    async fn list_documents(&self) -> AppResult<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents ORDER BY uploaded_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    async fn delete_document(&self, id: Uuid) -> AppResult<Option<(Document, u64)>> {
        let mut tx = self.pool.begin().await?;

        let message_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE document_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        let deleted = sqlx::query_as::<_, Document>("DELETE FROM documents WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(deleted.map(|doc| (doc, message_count.max(0) as u64)))
    }

    async fn insert_message(&self, message: &ChatMessage) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, document_id, message_type, content, timestamp, citations)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(message.document_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp)
        .bind(Json(&message.citations))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn messages_for_document(&self, document_id: Uuid) -> AppResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT id, document_id, message_type, content, timestamp, citations
            FROM chat_messages
            WHERE document_id = $1
            -- seq orders messages written within the same microsecond
            ORDER BY timestamp ASC, seq ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    async fn health_check(&self) -> AppResult<()> {
        super::health_check(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
