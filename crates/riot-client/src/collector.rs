use std::sync::Arc;

use async_trait::async_trait;
use crawler_core::collector::{CollectOutcome, MatchCollector};
use crawler_core::config::RiotConfig;
use crawler_core::types::Region;
use crawler_core::{CrawlDb, CrawlError};
use tracing::{debug, warn};

use crate::{Result, RiotClient, RiotError};

/// [`MatchCollector`] backed by match-v5.
///
/// Built without an API key it still constructs, but reports a
/// configuration error from `check_ready` and fails every collection.
pub struct RiotMatchCollector {
    client: Option<RiotClient>,
    db: Arc<CrawlDb>,
}

impl RiotMatchCollector {
    pub fn new(config: &RiotConfig, db: Arc<CrawlDb>) -> Result<Self> {
        let client = match RiotClient::from_config(config) {
            Ok(client) => Some(client),
            Err(RiotError::MissingApiKey) => None,
            Err(e) => return Err(e),
        };
        Ok(Self { client, db })
    }

    pub fn with_client(client: RiotClient, db: Arc<CrawlDb>) -> Self {
        Self {
            client: Some(client),
            db,
        }
    }

    /// Fetch and store every listed match not already stored. Returns the
    /// number newly stored.
    async fn collect_matches(&self, puuid: &str, region: Region, max_count: u32) -> Result<u32> {
        let client = self.client.as_ref().ok_or(RiotError::MissingApiKey)?;
        let routing = region.routing();
        let ids = client.match_ids_by_puuid(puuid, routing, max_count).await?;

        let mut stored = 0u32;
        for match_id in ids {
            if self.db.has_match(&match_id)? {
                debug!(match_id = %match_id, "match already stored");
                continue;
            }
            let dto = match client.match_by_id(&match_id, routing).await {
                Ok(dto) => dto,
                Err(RiotError::NotFound(_)) => {
                    warn!(match_id = %match_id, "listed match not found, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if self.db.store_match(&dto.summary())? {
                stored += 1;
            }
        }
        Ok(stored)
    }
}

#[async_trait]
impl MatchCollector for RiotMatchCollector {
    async fn check_ready(&self) -> crawler_core::Result<()> {
        if self.client.is_none() {
            return Err(CrawlError::from(RiotError::MissingApiKey));
        }
        Ok(())
    }

    async fn collect(&self, identifier: &str, region: Region, max_count: u32) -> CollectOutcome {
        match self.collect_matches(identifier, region, max_count).await {
            Ok(n) => CollectOutcome::Collected(n),
            Err(RiotError::NotFound(_)) => CollectOutcome::NotFound,
            Err(e) => CollectOutcome::Failed(e.to_string()),
        }
    }
}
