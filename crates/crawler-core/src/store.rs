use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::player::{DiscoveredPlayer, QueueStatus, StatusUpdate};
use crate::types::Region;

/// Persistence contract for discovered players.
///
/// Implementations must keep `identifier` unique: a second `insert_pending`
/// for a known identifier fails with `CrawlError::DuplicateIdentifier`.
pub trait PlayerRecordStore: Send + Sync {
    fn insert_pending(&self, identifier: &str, region: Region) -> Result<DiscoveredPlayer>;

    /// All `Pending` rows, oldest first.
    fn list_pending(&self) -> Result<Vec<DiscoveredPlayer>>;

    fn update_status(&self, id: Uuid, update: &StatusUpdate) -> Result<DiscoveredPlayer>;

    /// The subset of `candidates` that already has a row.
    fn list_known_identifiers(&self, candidates: &[String]) -> Result<HashSet<String>>;

    fn count_by_status(&self) -> Result<QueueStatus>;

    /// Move every `Failed` row back to `Pending`. Returns the number moved.
    fn reset_failed(&self) -> Result<usize>;

    /// Move `Failed` rows whose retry backoff has elapsed back to `Pending`.
    fn requeue_due(&self, now: DateTime<Utc>, max_attempts: u32) -> Result<usize>;

    /// Move rows left in `Crawling` by an interrupted run back to `Pending`.
    fn recover_interrupted(&self) -> Result<usize>;
}
