//! Document management endpoints

use axum::{
    Router,
    routing::get,
    Json,
    extract::{Path, State},
};
use crate::models::{AppState, DeleteDocumentResponse, DocumentResponse};
use crate::routes::extract::{document_not_found, parse_document_id};
use crate::types::AppResult;
use tracing::{info, warn};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/documents/", get(list_documents))
        .route("/api/documents/{id}/", get(get_document).delete(delete_document))
        .with_state(state)
}

/// GET /api/documents/ - All documents, newest first
async fn list_documents(State(state): State<AppState>) -> AppResult<Json<Vec<DocumentResponse>>> {
    let documents = state
        .repo
        .list_documents()
        .await?
        .iter()
        .map(DocumentResponse::from)
        .collect();

    Ok(Json(documents))
}

/// GET /api/documents/{id}/ - One document
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DocumentResponse>> {
    let id = parse_document_id(&id)?;
    let document = state.repo.get_document(id).await?.ok_or_else(document_not_found)?;

    Ok(Json(DocumentResponse::from(&document)))
}

/// DELETE /api/documents/{id}/ - Remove a document, its chat history and its file
async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteDocumentResponse>> {
    let id = parse_document_id(&id)?;
    let (document, deleted_messages) = state
        .repo
        .delete_document(id)
        .await?
        .ok_or_else(document_not_found)?;

    if let Err(e) = state.files.delete(&document.file).await {
        warn!(error = %e, file = %document.file, "Document deleted but its file could not be removed");
    }

    info!(document_id = %id, title = %document.title, deleted_messages, "Deleted document");

    Ok(Json(DeleteDocumentResponse {
        success: true,
        document_id: id,
        deleted_messages,
    }))
}
