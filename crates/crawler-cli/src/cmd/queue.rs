use crate::output::{print_fields, print_json};
use crawler_core::store::PlayerRecordStore;
use std::path::Path;

pub fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let db = super::open_db(root, &config)?;
    let queue = db.count_by_status()?;

    if json {
        print_json(&serde_json::json!({
            "queue": queue,
            "total": queue.total(),
        }))?;
    } else {
        print_fields(&[
            ("pending", queue.pending.to_string()),
            ("crawling", queue.crawling.to_string()),
            ("completed", queue.completed.to_string()),
            ("failed", queue.failed.to_string()),
            ("total", queue.total().to_string()),
        ]);
    }
    Ok(())
}

pub fn retry_failed(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let db = super::open_db(root, &config)?;
    let reset = db.reset_failed()?;
    tracing::info!(reset, "failed players reset to pending");

    if json {
        print_json(&serde_json::json!({ "playersReset": reset }))?;
    } else {
        println!("Reset {reset} failed player(s) to pending");
    }
    Ok(())
}
