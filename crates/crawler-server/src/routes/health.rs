use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/health: liveness plus whether the pipeline loop is running.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "pipelineRunning": app.orchestrator.is_running(),
    }))
}
