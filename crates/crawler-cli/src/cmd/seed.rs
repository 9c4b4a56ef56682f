use crate::output::{print_fields, print_json};
use crawler_core::seeder::Seeder;
use crawler_core::types::Region;
use std::path::Path;

pub fn run(
    root: &Path,
    region: Option<&str>,
    count: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let region: Region = match region {
        Some(r) => r.parse()?,
        None => config.default_region()?,
    };
    let count = count.unwrap_or(config.seed.default_count);

    let db = super::open_db(root, &config)?;
    let seeder = Seeder::new(db.clone(), db, &config.seed);
    let report = seeder.seed(region, count)?;

    if json {
        print_json(&serde_json::json!({
            "region": region,
            "report": report,
        }))?;
    } else {
        print_fields(&[
            ("region", region.to_string()),
            ("matches analyzed", report.matches_analyzed.to_string()),
            ("identifiers seen", report.unique_identifiers_seen.to_string()),
            ("players added", report.new_players_added.to_string()),
        ]);
    }
    Ok(())
}
