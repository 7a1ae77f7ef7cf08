//! API Routes
//!
//! - `/api/upload/` - PDF upload
//! - `/api/chat/` - Questions about a document
//! - `/api/documents/` - Document listing, detail, deletion and chat history
//! - `/api/serve-pdf/{id}/` - Raw PDF bytes
//! - `/api/health` - Health checks
//!
//! Paths keep their trailing slash; the frontend requests them that way.

pub mod chat;
pub mod documents;
pub mod extract;
pub mod files;
pub mod health;

use axum::Router;
use tower_http::trace::TraceLayer;
use crate::middleware::cors_layer;
use crate::models::AppState;
use tracing::info;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(files::router(state.clone()))
        .merge(chat::router(state.clone()))
        .merge(documents::router(state.clone()))
        .merge(health::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
