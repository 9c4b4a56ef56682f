use crate::output::{print_fields, print_json};
use crawler_core::processor::Processor;
use riot_client::RiotMatchCollector;
use std::path::Path;
use std::sync::Arc;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let db = super::open_db(root, &config)?;
    let collector = RiotMatchCollector::new(&config.riot, db.clone())?;
    let processor = Processor::new(db, Arc::new(collector), &config.process);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(processor.process_pending())?;

    if json {
        print_json(&serde_json::json!({ "report": report }))?;
    } else {
        print_fields(&[
            ("players processed", report.players_processed.to_string()),
            ("matches collected", report.matches_collected.to_string()),
            ("players failed", report.players_failed.to_string()),
        ]);
    }
    Ok(())
}
