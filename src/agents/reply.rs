//! Reply Agent
//!
//! Answers a user's question about one document. The model sees the document
//! title and a fixed-size prefix of its extracted text; page references in
//! the answer become citations.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agents::citations::extract_citations;
use crate::db::Repository;
use crate::llm::LLMAdapter;
use crate::models::{ChatMessage, Citation, Document};
use crate::types::{AppResult, LLMMessage, LLMRequest};

/// Characters of extracted text placed in the prompt.
pub const CONTEXT_CHAR_LIMIT: usize = 4000;
pub const MAX_REPLY_TOKENS: u32 = 500;
pub const REPLY_TEMPERATURE: f32 = 0.7;

pub const MISSING_API_KEY_MESSAGE: &str =
    "OpenAI API key not configured. Please set OPENAI_API_KEY in your environment.";

/// Why a reply was produced without a model answer.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    MissingApiKey,
    ApiError(String),
}

/// Outcome of a generation attempt. Both variants are shown to the user the
/// same way; only an `Answer` carries citations.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Answer {
        content: String,
        citations: Vec<Citation>,
    },
    Fallback {
        content: String,
        reason: FallbackReason,
    },
}

impl Generation {
    fn fallback(reason: FallbackReason) -> Self {
        let content = match &reason {
            FallbackReason::MissingApiKey => MISSING_API_KEY_MESSAGE.to_string(),
            FallbackReason::ApiError(e) => format!(
                "Sorry, I encountered an error while processing your request: {}",
                e
            ),
        };
        Generation::Fallback { content, reason }
    }

    pub fn content(&self) -> &str {
        match self {
            Generation::Answer { content, .. } | Generation::Fallback { content, .. } => content,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Generation::Fallback { .. })
    }

    pub fn into_parts(self) -> (String, Vec<Citation>) {
        match self {
            Generation::Answer { content, citations } => (content, citations),
            Generation::Fallback { content, .. } => (content, Vec::new()),
        }
    }
}

pub struct ReplyAgent {
    adapter: Option<Arc<dyn LLMAdapter>>,
    model: String,
}

impl ReplyAgent {
    /// `adapter` is `None` when no API key is configured.
    pub fn new(adapter: Option<Arc<dyn LLMAdapter>>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            model: model.into(),
        }
    }

    /// Record the user's turn, generate an answer and record it as the
    /// assistant's turn. The user turn is stored before generation starts,
    /// so it survives any generation failure.
    pub async fn respond(
        &self,
        repo: &dyn Repository,
        document: &Document,
        message: &str,
    ) -> AppResult<ChatMessage> {
        let user_message = ChatMessage::user(document.id, message);
        repo.insert_message(&user_message).await?;

        let generation = self.generate_response(document, message).await;
        if generation.is_fallback() {
            warn!(document_id = %document.id, "Answering with fallback content");
        }

        let (content, citations) = generation.into_parts();
        let assistant_message = ChatMessage::assistant(document.id, content, citations);
        repo.insert_message(&assistant_message).await?;

        Ok(assistant_message)
    }

    /// Ask the model about `document`. Never fails: a missing key or a failed
    /// call yields a `Generation::Fallback`.
    pub async fn generate_response(&self, document: &Document, user_message: &str) -> Generation {
        info!(
            document_id = %document.id,
            message_len = user_message.len(),
            "Generating reply"
        );

        let Some(adapter) = &self.adapter else {
            warn!("No LLM API key configured, using fallback response");
            return Generation::fallback(FallbackReason::MissingApiKey);
        };

        let request = self.build_request(document, user_message);

        match adapter.create_chat_completion(&request).await {
            Ok(response) => {
                let citations = extract_citations(&response.content);
                info!(
                    response_len = response.content.len(),
                    citation_count = citations.len(),
                    total_tokens = response.usage.total_tokens,
                    "Generated reply successfully"
                );
                Generation::Answer {
                    content: response.content,
                    citations,
                }
            }
            Err(e) => {
                error!(error = %e, "LLM call failed, using fallback response");
                Generation::fallback(FallbackReason::ApiError(e.to_string()))
            }
        }
    }

    fn build_request(&self, document: &Document, user_message: &str) -> LLMRequest {
        LLMRequest {
            model: self.model.clone(),
            messages: vec![
                LLMMessage::system(Self::create_system_prompt(document)),
                LLMMessage::user(user_message),
            ],
            max_tokens: Some(MAX_REPLY_TOKENS),
            temperature: Some(REPLY_TEMPERATURE),
        }
    }

    fn create_system_prompt(document: &Document) -> String {
        let document_text = truncate_chars(&document.text_content, CONTEXT_CHAR_LIMIT);

        format!(r#"You are an AI assistant helping users understand a PDF document.
The document is titled: "{title}"

Here is the document content:
{document_text}

Please provide helpful, accurate responses based on the document content.
When referencing specific information, mention the page number if available.
Keep responses concise and relevant to the user's question."#,
            title = document.title,
            document_text = document_text,
        )
    }
}

/// The first `limit` characters of `text`, cut without regard for word or
/// page boundaries.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
