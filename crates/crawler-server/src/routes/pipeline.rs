use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use crawler_core::orchestrator::{StartOutcome, StartParams};
use crawler_core::types::Region;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCommand {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub seed_region: Option<String>,
    #[serde(default)]
    pub seed_count: Option<u32>,
    #[serde(default, alias = "maxRiotCallsPerCycle")]
    pub max_external_calls_per_cycle: Option<u32>,
}

impl PipelineCommand {
    /// Missing fields fall back to the configured pipeline defaults.
    fn start_params(&self, app: &AppState) -> Result<StartParams, AppError> {
        let mut params = StartParams::from_config(&app.config)?;
        if let Some(region) = self.seed_region.as_deref() {
            params.seed_region = region.parse::<Region>()?;
        }
        if let Some(count) = self.seed_count {
            params.seed_count = count;
        }
        if let Some(quota) = self.max_external_calls_per_cycle {
            params.max_external_calls_per_cycle = quota;
        }
        Ok(params)
    }
}

/// GET /api/admin/pipeline: current pipeline snapshot.
pub async fn get_pipeline(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "state": app.orchestrator.status(),
    }))
}

/// POST /api/admin/pipeline: `{ "action": "start" | "stop", … }`.
///
/// An empty body is treated as `{}`, which is an invalid action.
pub async fn post_pipeline(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let cmd: PipelineCommand = if body.iter().all(u8::is_ascii_whitespace) {
        PipelineCommand::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::bad_request(format!("invalid request body: {e}")))?
    };

    match cmd.action.as_deref() {
        Some("start") => {
            let params = cmd.start_params(&app)?;
            let outcome = app.orchestrator.start(params).await?;
            let body = match outcome {
                StartOutcome::Started(state) => serde_json::json!({
                    "success": true,
                    "state": state,
                }),
                StartOutcome::AlreadyRunning(state) => serde_json::json!({
                    "success": true,
                    "state": state,
                    "message": "pipeline already running",
                }),
            };
            Ok(Json(body))
        }
        Some("stop") => {
            let state = app.orchestrator.stop().await?;
            Ok(Json(serde_json::json!({ "success": true, "state": state })))
        }
        _ => Err(AppError::bad_request("invalid action (start|stop)")),
    }
}
