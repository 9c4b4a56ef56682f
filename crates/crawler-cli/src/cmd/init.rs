use crate::output::print_json;
use anyhow::Context;
use crawler_core::config::CrawlerConfig;
use crawler_core::{io, paths};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config_path = paths::config_path(root);
    let yaml = serde_yaml::to_string(&CrawlerConfig::default())?;
    let wrote_config = io::create_if_absent(&config_path, yaml.as_bytes())
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    // An existing config may point the database elsewhere.
    let config = CrawlerConfig::load(root).context("failed to load config")?;
    let db_path = config.resolved_db_path(root);
    super::open_db(root, &config)?;

    if json {
        print_json(&serde_json::json!({
            "root": root,
            "config": config_path,
            "configCreated": wrote_config,
            "database": db_path,
        }))?;
    } else {
        println!("Initialized crawler in {}", root.display());
        if wrote_config {
            println!("  created {}", config_path.display());
        } else {
            println!("  kept existing {}", config_path.display());
        }
        println!("  database {}", db_path.display());
    }
    Ok(())
}
