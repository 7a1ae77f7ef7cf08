use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::agents::ReplyAgent;
use crate::config::Config;
use crate::db::Repository;
use crate::storage::FileStorage;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub files: FileStorage,
    pub reply_agent: Arc<ReplyAgent>,
    pub config: Config,
}

// Timestamps are kept at microsecond precision so a record read back from
// Postgres compares equal to the one that was written.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// An uploaded PDF together with its extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    /// Location of the stored bytes, relative to the media root.
    pub file: String,
    pub uploaded_at: DateTime<Utc>,
    pub page_count: i32,
    pub text_content: String,
}

impl Document {
    pub fn new(title: impl Into<String>, file: impl Into<String>, page_count: i32, text_content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            file: file.into(),
            uploaded_at: now(),
            page_count,
            text_content,
        }
    }

    pub fn filename(&self) -> String {
        Path::new(&self.file)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

/// A page reference found in an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub page: u32,
    pub text: String,
}

impl Citation {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            text: format!("Page {}", page),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    #[serde(rename = "document")]
    pub document_id: Uuid,
    #[serde(rename = "message_type")]
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub citations: Vec<Citation>,
}

impl ChatMessage {
    pub fn new(document_id: Uuid, role: MessageRole, content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            role,
            content: content.into(),
            timestamp: now(),
            citations,
        }
    }

    pub fn user(document_id: Uuid, content: impl Into<String>) -> Self {
        Self::new(document_id, MessageRole::User, content, Vec::new())
    }

    pub fn assistant(document_id: Uuid, content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self::new(document_id, MessageRole::Assistant, content, citations)
    }
}

// API Request/Response types

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub file: String,
    pub uploaded_at: DateTime<Utc>,
    pub page_count: i32,
    pub filename: String,
}

impl From<&Document> for DocumentResponse {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title.clone(),
            file: doc.file.clone(),
            uploaded_at: doc.uploaded_at,
            page_count: doc.page_count,
            filename: doc.filename(),
        }
    }
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

// Keeps an explicit `null` apart from an absent field.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn required(value: &Option<Value>) -> Result<&Value, ValidationError> {
    match value {
        None => Err(field_error("required", "This field is required.")),
        Some(Value::Null) => Err(field_error("null", "This field may not be null.")),
        Some(value) => Ok(value),
    }
}

fn chat_text(value: &Option<Value>) -> Result<String, ValidationError> {
    let text = match required(value)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(field_error("invalid", "Not a valid string.")),
    };
    if text.is_empty() {
        return Err(field_error("blank", "This field may not be blank."));
    }
    Ok(text)
}

fn document_ref(value: &Option<Value>) -> Result<Uuid, ValidationError> {
    match required(value)? {
        Value::String(s) => Uuid::parse_str(s).map_err(|_| field_error("invalid", "Must be a valid UUID.")),
        _ => Err(field_error("invalid", "Must be a valid UUID.")),
    }
}

/// Body of `POST /api/chat/` as received. Fields are kept loose so that a
/// missing or mistyped field is reported against its name like any other
/// validation failure.
#[derive(Debug, Default, Deserialize)]
pub struct ChatPayload {
    #[serde(default, deserialize_with = "present")]
    pub message: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub document_id: Option<Value>,
}

impl ChatPayload {
    /// Check every field, collecting all failures.
    pub fn parse(&self) -> Result<ChatRequest, ValidationErrors> {
        match (chat_text(&self.message), document_ref(&self.document_id)) {
            (Ok(message), Ok(document_id)) => Ok(ChatRequest { message, document_id }),
            (message, document_id) => {
                let mut errors = ValidationErrors::new();
                if let Err(e) = message {
                    errors.add("message", e);
                }
                if let Err(e) = document_id {
                    errors.add("document_id", e);
                }
                Err(errors)
            }
        }
    }
}

impl Validate for ChatPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.parse().map(|_| ())
    }
}

/// A checked chat request; `message` is trimmed and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub document_id: Uuid,
}

/// The assistant turn as returned from the chat endpoint.
#[derive(Debug, Serialize)]
pub struct AssistantReply {
    pub id: Uuid,
    pub message_type: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub citations: Vec<Citation>,
}

impl From<&ChatMessage> for AssistantReply {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            message_type: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp,
            citations: message.citations.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: AssistantReply,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Serialize)]
pub struct DeleteDocumentResponse {
    pub success: bool,
    pub document_id: Uuid,
    pub deleted_messages: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}
