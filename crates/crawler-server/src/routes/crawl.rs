use axum::extract::State;
use axum::Json;
use crawler_core::store::PlayerRecordStore;
use crawler_core::types::Region;
use crawler_core::CrawlError;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/crawl/queue: row counts per crawl status plus the progress of
/// the current (or last) processing run.
pub async fn get_queue(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let queue = tokio::task::spawn_blocking(move || db.count_by_status())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!({
        "success": true,
        "queue": queue,
        "total": queue.total(),
        "progress": app.processor.progress(),
    })))
}

/// POST /api/crawl/retry-failed: move every failed row back to pending.
pub async fn retry_failed(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let reset = tokio::task::spawn_blocking(move || db.reset_failed())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    tracing::info!(reset, "failed players reset to pending");
    Ok(Json(serde_json::json!({
        "success": true,
        "playersReset": reset,
    })))
}

/// The pipeline loop, a stopped loop still finishing its step, or another
/// processing run currently owns the queue.
fn queue_in_use(app: &AppState) -> bool {
    app.orchestrator.is_busy() || app.processor.is_busy()
}

#[derive(Debug, Deserialize)]
pub struct SeedBody {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
}

/// POST /api/crawl/seed: run one seed pass outside the pipeline loop.
pub async fn seed(
    State(app): State<AppState>,
    Json(body): Json<SeedBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if queue_in_use(&app) {
        return Err(AppError::busy());
    }
    let region: Region = body
        .region
        .as_deref()
        .ok_or_else(|| CrawlError::Validation("region is required".to_string()))?
        .parse()?;
    let count = body.count.unwrap_or(app.config.seed.default_count);

    let seeder = app.seeder.clone();
    let report = tokio::task::spawn_blocking(move || seeder.seed(region, count))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!({
        "success": true,
        "region": region,
        "report": report,
    })))
}

/// POST /api/crawl/process: drain the pending queue once.
pub async fn process(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    if queue_in_use(&app) {
        return Err(AppError::busy());
    }
    let report = app.processor.process_pending().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "report": report,
    })))
}
