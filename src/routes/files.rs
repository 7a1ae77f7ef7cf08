use axum::{
    Router,
    routing::{get, post},
    Json,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use crate::agents::FileUploadAgent;
use crate::models::{AppState, DocumentResponse};
use crate::routes::extract::{document_not_found, parse_document_id};
use crate::types::{AppError, AppResult};
use tracing::{info, warn};

pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    Router::new()
        .route(
            "/api/upload/",
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/serve-pdf/{id}/", get(serve_pdf))
        .with_state(state)
}

/// POST /api/upload/ - multipart upload; the PDF travels in the `file` field
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    info!("File upload request received");

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Failed to read upload: {}", e)))?
    {
        // Plain form fields named "file" carry no filename and are not uploads
        let Some(filename) = field.file_name().and_then(FileUploadAgent::clean_filename) else {
            continue;
        };
        if field.name() != Some("file") {
            continue;
        }

        if !FileUploadAgent::is_pdf(&filename) {
            warn!(filename = %filename, "Rejected non-PDF upload");
            return Err(AppError::InvalidRequest("Only PDF files are allowed".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::InvalidRequest("No file provided".to_string()))?;

    let document =
        FileUploadAgent::process_file(state.repo.as_ref(), &state.files, &filename, data.to_vec()).await?;

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(&document))))
}

/// GET /api/serve-pdf/{id}/ - raw bytes for in-browser viewers on other origins
async fn serve_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_document_id(&id)?;
    let document = state.repo.get_document(id).await?.ok_or_else(document_not_found)?;

    let data = state
        .files
        .read(&document.file)
        .await?
        .ok_or_else(|| AppError::NotFound("PDF file not found".to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::APPLICATION_PDF.essence_str()),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
        ],
        data,
    )
        .into_response())
}
