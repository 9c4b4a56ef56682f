use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::activity::ActivityLog;
use crate::config::CrawlerConfig;
use crate::error::{CrawlError, Result};
use crate::types::{PipelineStep, Region};

/// Parameters of one pipeline run, fixed at `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    pub seed_region: Region,
    pub seed_count: u32,
    pub max_external_calls_per_cycle: u32,
}

impl StartParams {
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            seed_region: config.default_region()?,
            seed_count: config.pipeline.seed_count,
            max_external_calls_per_cycle: config.pipeline.max_external_calls_per_cycle,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.seed_count == 0 {
            return Err(CrawlError::Validation(
                "seedCount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read-only copy of [`PipelineState`] handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub running: bool,
    pub cycles: u64,
    pub current_step: PipelineStep,
    pub last_message: Option<String>,
    pub recent: Vec<String>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub generation: u64,
    pub params: Option<StartParams>,
}

/// Process-wide pipeline state. Lives as long as the orchestrator; `stop`
/// never clears it.
#[derive(Debug)]
pub struct PipelineState {
    pub running: bool,
    pub cycles: u64,
    pub current_step: PipelineStep,
    pub last_message: Option<String>,
    pub recent: ActivityLog,
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Bumped on every accepted start. A loop only writes while its
    /// generation is current.
    pub generation: u64,
    pub params: Option<StartParams>,
}

impl PipelineState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            running: false,
            cycles: 0,
            current_step: PipelineStep::Idle,
            last_message: None,
            recent: ActivityLog::new(log_capacity),
            last_cycle_at: None,
            generation: 0,
            params: None,
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(generation = self.generation, step = %self.current_step, "{message}");
        self.recent.push(message.clone());
        self.last_message = Some(message);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            running: self.running,
            cycles: self.cycles,
            current_step: self.current_step,
            last_message: self.last_message.clone(),
            recent: self.recent.lines(),
            last_cycle_at: self.last_cycle_at,
            generation: self.generation,
            params: self.params.clone(),
        }
    }
}
