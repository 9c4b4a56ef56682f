use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CRAWLER_DIR: &str = ".crawler";
pub const CONFIG_FILE: &str = ".crawler/config.yaml";
pub const DB_FILE: &str = ".crawler/crawl.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn crawler_dir(root: &Path) -> PathBuf {
    root.join(CRAWLER_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Default database location, used when the config does not override `db_path`.
pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_under_crawler_dir() {
        let root = Path::new("/srv/rift");
        assert_eq!(config_path(root), PathBuf::from("/srv/rift/.crawler/config.yaml"));
        assert_eq!(db_path(root), PathBuf::from("/srv/rift/.crawler/crawl.redb"));
        assert!(db_path(root).starts_with(crawler_dir(root)));
    }
}
