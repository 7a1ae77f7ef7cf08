use axum::{Router, routing::get, Json, extract::State};
use crate::models::{AppState, HealthResponse};
use tracing::warn;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.repo.health_check().await {
        Ok(()) => ("ok", format!("connected ({})", state.repo.backend_name())),
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            ("degraded", "unavailable".to_string())
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database,
    })
}
