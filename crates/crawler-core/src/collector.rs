use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Region;

/// Result of collecting one player's matches.
///
/// A player the upstream API does not know is `NotFound`, which the
/// processor treats as a completed crawl with nothing collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum CollectOutcome {
    Collected(u32),
    NotFound,
    Failed(String),
}

/// Fetches and persists a player's recent matches.
#[async_trait]
pub trait MatchCollector: Send + Sync {
    /// Fails with `CrawlError::Configuration` when the collector cannot run
    /// at all, e.g. without an API credential.
    async fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn collect(&self, identifier: &str, region: Region, max_count: u32) -> CollectOutcome;
}
