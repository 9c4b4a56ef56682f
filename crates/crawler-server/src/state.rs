use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use crawler_core::config::CrawlerConfig;
use crawler_core::orchestrator::{CrawlPipeline, Orchestrator};
use crawler_core::processor::Processor;
use crawler_core::seeder::Seeder;
use crawler_core::store::PlayerRecordStore;
use crawler_core::CrawlDb;
use riot_client::{RiotAccountSyncer, RiotMatchCollector};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<CrawlerConfig>,
    pub db: Arc<CrawlDb>,
    pub seeder: Arc<Seeder>,
    pub processor: Arc<Processor>,
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Open the database, return interrupted rows to the queue and spawn
    /// the orchestrator. Must run inside a Tokio runtime.
    pub fn new(root: PathBuf, config: CrawlerConfig) -> anyhow::Result<Self> {
        let db_path = config.resolved_db_path(&root);
        let db = Arc::new(
            CrawlDb::open(&db_path)
                .with_context(|| format!("opening crawl database at {}", db_path.display()))?,
        );

        let recovered = db.recover_interrupted()?;
        if recovered > 0 {
            tracing::info!(recovered, "returned interrupted players to the queue");
        }

        let collector = RiotMatchCollector::new(&config.riot, db.clone())?;
        let syncer = RiotAccountSyncer::new(&config.riot, &config.sync, db.clone())?;
        let seeder = Arc::new(Seeder::new(db.clone(), db.clone(), &config.seed));
        let processor = Arc::new(Processor::new(
            db.clone(),
            Arc::new(collector),
            &config.process,
        ));
        let pipeline = CrawlPipeline::new(seeder.clone(), processor.clone(), Arc::new(syncer));
        let orchestrator = Orchestrator::spawn(Arc::new(pipeline), &config.pipeline);

        Ok(Self {
            root,
            config: Arc::new(config),
            db,
            seeder,
            processor,
            orchestrator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_core::types::{CrawlStatus, Region};
    use crawler_core::player::StatusUpdate;
    use tempfile::TempDir;

    #[tokio::test]
    async fn new_state_recovers_interrupted_rows() {
        let dir = TempDir::new().unwrap();
        let config = CrawlerConfig::default();
        {
            let db = CrawlDb::open(&config.resolved_db_path(dir.path())).unwrap();
            let p = db.insert_pending("p1", Region::Euw1).unwrap();
            db.update_status(p.id, &StatusUpdate::crawling()).unwrap();
        }

        let state = AppState::new(dir.path().to_path_buf(), config).unwrap();
        let p1 = state.db.find_player("p1").unwrap().unwrap();
        assert_eq!(p1.crawl_status, CrawlStatus::Pending);
        assert!(!state.orchestrator.is_running());
    }
}
