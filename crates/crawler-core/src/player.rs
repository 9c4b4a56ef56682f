//! Discovered-player records: the crawl queue's unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CrawlStatus, Region};

// ---------------------------------------------------------------------------
// DiscoveredPlayer
// ---------------------------------------------------------------------------

/// A player identifier found by the seeder and tracked through the crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPlayer {
    pub id: Uuid,
    /// Player PUUID. Unique across all rows.
    pub identifier: String,
    pub region: Region,
    pub crawl_status: CrawlStatus,
    /// Only written when the row reaches `Completed`.
    #[serde(default)]
    pub matches_collected: u32,
    /// Set every time the row leaves `Crawling`.
    #[serde(default)]
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub next_eligible_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl DiscoveredPlayer {
    pub fn new_pending(identifier: impl Into<String>, region: Region) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier: identifier.into(),
            region,
            crawl_status: CrawlStatus::Pending,
            matches_collected: 0,
            last_crawled_at: None,
            created_at: Utc::now(),
            retry_count: 0,
            next_eligible_at: None,
            last_error: None,
        }
    }

    pub fn apply(&mut self, update: &StatusUpdate) {
        self.crawl_status = update.status;
        match update.status {
            CrawlStatus::Completed => {
                if let Some(n) = update.matches_collected {
                    self.matches_collected = n;
                }
                self.last_error = None;
                self.next_eligible_at = None;
            }
            CrawlStatus::Failed => {
                self.retry_count = self.retry_count.saturating_add(1);
                self.last_error = update.error.clone();
                self.next_eligible_at = update.next_eligible_at;
            }
            CrawlStatus::Pending | CrawlStatus::Crawling => {}
        }
        if let Some(at) = update.crawled_at {
            self.last_crawled_at = Some(at);
        }
    }

    /// True when a failed row may be re-queued under a retry policy.
    pub fn retry_due(&self, now: DateTime<Utc>, max_attempts: u32) -> bool {
        self.crawl_status == CrawlStatus::Failed
            && self.retry_count < max_attempts
            && self.next_eligible_at.is_some_and(|at| at <= now)
    }
}

// ---------------------------------------------------------------------------
// StatusUpdate
// ---------------------------------------------------------------------------

/// A state-machine transition for one row, applied by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: CrawlStatus,
    pub matches_collected: Option<u32>,
    pub crawled_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub next_eligible_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    pub fn crawling() -> Self {
        Self {
            status: CrawlStatus::Crawling,
            matches_collected: None,
            crawled_at: None,
            error: None,
            next_eligible_at: None,
        }
    }

    pub fn completed(matches_collected: u32, at: DateTime<Utc>) -> Self {
        Self {
            status: CrawlStatus::Completed,
            matches_collected: Some(matches_collected),
            crawled_at: Some(at),
            error: None,
            next_eligible_at: None,
        }
    }

    pub fn failed(
        reason: impl Into<String>,
        at: DateTime<Utc>,
        next_eligible_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status: CrawlStatus::Failed,
            matches_collected: None,
            crawled_at: Some(at),
            error: Some(reason.into()),
            next_eligible_at,
        }
    }
}

// ---------------------------------------------------------------------------
// QueueStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub crawling: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueStatus {
    pub fn record(&mut self, status: CrawlStatus) {
        match status {
            CrawlStatus::Pending => self.pending += 1,
            CrawlStatus::Crawling => self.crawling += 1,
            CrawlStatus::Completed => self.completed += 1,
            CrawlStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.crawling + self.completed + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_player_is_pending_with_zero_matches() {
        let p = DiscoveredPlayer::new_pending("puuid-1", Region::Euw1);
        assert_eq!(p.crawl_status, CrawlStatus::Pending);
        assert_eq!(p.matches_collected, 0);
        assert!(p.last_crawled_at.is_none());
    }

    #[test]
    fn failure_keeps_match_count_and_records_reason() {
        let mut p = DiscoveredPlayer::new_pending("puuid-1", Region::Euw1);
        p.matches_collected = 7;
        let now = Utc::now();
        p.apply(&StatusUpdate::failed("HTTP 503", now, None));
        assert_eq!(p.crawl_status, CrawlStatus::Failed);
        assert_eq!(p.matches_collected, 7);
        assert_eq!(p.last_crawled_at, Some(now));
        assert_eq!(p.last_error.as_deref(), Some("HTTP 503"));
        assert_eq!(p.retry_count, 1);
    }

    #[test]
    fn completion_clears_previous_error() {
        let mut p = DiscoveredPlayer::new_pending("puuid-1", Region::Euw1);
        p.apply(&StatusUpdate::failed("boom", Utc::now(), None));
        p.apply(&StatusUpdate::completed(12, Utc::now()));
        assert_eq!(p.matches_collected, 12);
        assert!(p.last_error.is_none());
    }

    #[test]
    fn crawling_does_not_touch_crawled_at() {
        let mut p = DiscoveredPlayer::new_pending("puuid-1", Region::Euw1);
        p.apply(&StatusUpdate::crawling());
        assert_eq!(p.crawl_status, CrawlStatus::Crawling);
        assert!(p.last_crawled_at.is_none());
    }

    #[test]
    fn retry_due_respects_backoff_and_attempts() {
        let now = Utc::now();
        let mut p = DiscoveredPlayer::new_pending("puuid-1", Region::Euw1);
        p.apply(&StatusUpdate::failed("x", now, Some(now + Duration::seconds(30))));
        assert!(!p.retry_due(now, 3));
        assert!(p.retry_due(now + Duration::seconds(31), 3));
        assert!(!p.retry_due(now + Duration::seconds(31), 1));
    }

    #[test]
    fn old_records_without_retry_fields_deserialize() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "identifier": "abc",
            "region": "na1",
            "crawl_status": "completed",
            "created_at": Utc::now(),
        });
        let p: DiscoveredPlayer = serde_json::from_value(json).unwrap();
        assert_eq!(p.retry_count, 0);
        assert_eq!(p.matches_collected, 0);
        assert_eq!(p.region, Region::Na1);
    }
}
