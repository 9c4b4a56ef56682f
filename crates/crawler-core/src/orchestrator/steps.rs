use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CrawlError, Result};
use crate::processor::{ProcessReport, Processor};
use crate::seeder::{SeedReport, Seeder};
use crate::sync::{AccountSyncer, SyncReport};
use crate::types::Region;

/// The three steps of a pipeline cycle.
#[async_trait]
pub trait PipelineSteps: Send + Sync + 'static {
    /// Fails when a step could never succeed, e.g. without an API credential.
    async fn check_ready(&self) -> Result<()>;

    async fn seed(&self, region: Region, count: u32) -> Result<SeedReport>;

    async fn process(&self) -> Result<ProcessReport>;

    async fn sync(&self, max_external_calls: u32) -> Result<SyncReport>;
}

/// Production steps: seeder, processor, account syncer.
#[derive(Clone)]
pub struct CrawlPipeline {
    seeder: Arc<Seeder>,
    processor: Arc<Processor>,
    syncer: Arc<dyn AccountSyncer>,
}

impl CrawlPipeline {
    pub fn new(
        seeder: Arc<Seeder>,
        processor: Arc<Processor>,
        syncer: Arc<dyn AccountSyncer>,
    ) -> Self {
        Self {
            seeder,
            processor,
            syncer,
        }
    }
}

#[async_trait]
impl PipelineSteps for CrawlPipeline {
    async fn check_ready(&self) -> Result<()> {
        self.processor.collector().check_ready().await?;
        self.syncer.check_ready().await
    }

    async fn seed(&self, region: Region, count: u32) -> Result<SeedReport> {
        let seeder = self.seeder.clone();
        tokio::task::spawn_blocking(move || seeder.seed(region, count))
            .await
            .map_err(|e| CrawlError::External(format!("seed task failed: {e}")))?
    }

    async fn process(&self) -> Result<ProcessReport> {
        self.processor.process_pending().await
    }

    async fn sync(&self, max_external_calls: u32) -> Result<SyncReport> {
        self.syncer.sync(max_external_calls).await
    }
}
