pub mod config;
pub mod init;
pub mod process;
pub mod queue;
pub mod seed;
pub mod serve;

use anyhow::Context;
use crawler_core::config::CrawlerConfig;
use crawler_core::CrawlDb;
use std::path::Path;
use std::sync::Arc;

/// Load `.crawler/config.yaml` and overlay environment secrets.
pub(crate) fn load_config(root: &Path) -> anyhow::Result<CrawlerConfig> {
    let mut config = CrawlerConfig::load(root).context("failed to load config")?;
    config.apply_env();
    Ok(config)
}

pub(crate) fn open_db(root: &Path, config: &CrawlerConfig) -> anyhow::Result<Arc<CrawlDb>> {
    let path = config.resolved_db_path(root);
    let db = CrawlDb::open(&path)
        .with_context(|| format!("failed to open crawl database at {}", path.display()))?;
    Ok(Arc::new(db))
}
