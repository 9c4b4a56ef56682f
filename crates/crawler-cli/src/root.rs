use crawler_core::paths::CRAWLER_DIR;
use std::path::{Path, PathBuf};

/// Resolve the crawler root directory.
///
/// `--root` / `CRAWLER_ROOT` wins; otherwise walk upward from the current
/// directory looking for `.crawler/`, falling back to the current directory.
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_marked_ancestor(&cwd).unwrap_or(cwd)
}

fn find_marked_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CRAWLER_DIR).is_dir())
        .map(Path::to_path_buf)
}
