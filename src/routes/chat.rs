use axum::{
    Router,
    routing::{get, post},
    Json,
    extract::{Path, State},
};
use crate::models::{AppState, AssistantReply, ChatMessage, ChatPayload, ChatResponse};
use crate::routes::extract::{document_not_found, parse_document_id, ValidatedJson};
use crate::types::AppResult;
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/", post(post_chat))
        .route("/api/documents/{id}/chat/", get(chat_history))
        .with_state(state)
}

/// POST /api/chat/ - Ask a question about a document
pub async fn post_chat(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ChatPayload>,
) -> AppResult<Json<ChatResponse>> {
    let request = payload.parse()?;
    info!(document_id = %request.document_id, message_len = request.message.len(), "Received chat request");

    let document = state
        .repo
        .get_document(request.document_id)
        .await?
        .ok_or_else(document_not_found)?;

    let reply = state
        .reply_agent
        .respond(state.repo.as_ref(), &document, &request.message)
        .await?;

    info!(message_id = %reply.id, citations = reply.citations.len(), "Chat response sent");

    Ok(Json(ChatResponse {
        citations: reply.citations.clone(),
        response: AssistantReply::from(&reply),
    }))
}

/// GET /api/documents/{id}/chat/ - Conversation so far, oldest first
async fn chat_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let id = parse_document_id(&id)?;
    if state.repo.get_document(id).await?.is_none() {
        return Err(document_not_found());
    }

    let messages = state.repo.messages_for_document(id).await?;
    Ok(Json(messages))
}
