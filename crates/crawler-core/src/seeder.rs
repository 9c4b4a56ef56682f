//! Discovers unknown player identifiers and queues them for crawling.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SeedConfig;
use crate::error::{CrawlError, Result};
use crate::history::SeedSource;
use crate::store::PlayerRecordStore;
use crate::types::Region;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub matches_analyzed: usize,
    pub unique_identifiers_seen: usize,
    pub new_players_added: usize,
}

pub struct Seeder {
    source: Arc<dyn SeedSource>,
    store: Arc<dyn PlayerRecordStore>,
    recent_match_window: usize,
    fallback_user_limit: usize,
}

impl Seeder {
    pub fn new(
        source: Arc<dyn SeedSource>,
        store: Arc<dyn PlayerRecordStore>,
        config: &SeedConfig,
    ) -> Self {
        Self {
            source,
            store,
            recent_match_window: config.recent_match_window,
            fallback_user_limit: config.fallback_user_limit,
        }
    }

    /// Queue up to `desired_count` identifiers not yet known to the store.
    ///
    /// Candidates come from the newest stored matches on the region's
    /// platform; with no matches, registered users of the region are used
    /// instead. Candidates keep discovery order.
    pub fn seed(&self, region: Region, desired_count: u32) -> Result<SeedReport> {
        if desired_count == 0 {
            return Err(CrawlError::Validation(
                "seed count must be positive".to_string(),
            ));
        }

        let matches = self
            .source
            .recent_matches(region.platform_id(), self.recent_match_window)?;

        let mut seen = HashSet::new();
        let mut candidates: Vec<String> = Vec::new();
        let mut remember = |id: String| {
            if !id.is_empty() && seen.insert(id.clone()) {
                candidates.push(id);
            }
        };

        if matches.is_empty() {
            info!(region = %region, "no stored matches, seeding from registered users");
            for id in self
                .source
                .registered_identifiers(region, self.fallback_user_limit)?
            {
                remember(id);
            }
        } else {
            for m in &matches {
                for id in &m.participants {
                    remember(id.clone());
                }
            }
        }

        let known = self.store.list_known_identifiers(&candidates)?;
        let mut added = 0usize;
        for id in candidates
            .iter()
            .filter(|id| !known.contains(*id))
            .take(desired_count as usize)
        {
            match self.store.insert_pending(id, region) {
                Ok(_) => added += 1,
                Err(e) => warn!(identifier = %id, error = %e, "skipping identifier"),
            }
        }

        let report = SeedReport {
            matches_analyzed: matches.len(),
            unique_identifiers_seen: candidates.len(),
            new_players_added: added,
        };
        info!(
            region = %region,
            matches = report.matches_analyzed,
            unique = report.unique_identifiers_seen,
            added = report.new_players_added,
            "seed finished"
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::open_tmp;
    use crate::db::CrawlDb;
    use crate::history::{MatchSummary, RegisteredUser};
    use crate::player::{DiscoveredPlayer, QueueStatus, StatusUpdate};
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn seeder_over(db: Arc<CrawlDb>) -> Seeder {
        Seeder::new(db.clone(), db, &SeedConfig::default())
    }

    fn setup() -> (TempDir, Arc<CrawlDb>) {
        let (dir, db) = open_tmp();
        (dir, Arc::new(db))
    }

    fn store_match(db: &CrawlDb, id: &str, at: i64, participants: &[&str]) {
        db.store_match(&MatchSummary {
            match_id: id.into(),
            platform_id: "EUW1".into(),
            game_creation: at,
            participants: participants.iter().map(|s| s.to_string()).collect(),
        })
        .unwrap();
    }

    #[test]
    fn falls_back_to_registered_users_without_matches() {
        let (_dir, db) = setup();
        for id in ["u1", "u2", "u3"] {
            db.register_user(&RegisteredUser {
                identifier: id.into(),
                region: Region::Euw1,
            })
            .unwrap();
        }

        let report = seeder_over(db.clone()).seed(Region::Euw1, 5).unwrap();
        assert_eq!(
            report,
            SeedReport {
                matches_analyzed: 0,
                unique_identifiers_seen: 3,
                new_players_added: 3,
            }
        );
        assert_eq!(db.list_pending().unwrap().len(), 3);
    }

    #[test]
    fn second_seed_adds_nothing_new() {
        let (_dir, db) = setup();
        store_match(&db, "M1", 1_000, &["a", "b", "c"]);
        let seeder = seeder_over(db.clone());

        assert_eq!(seeder.seed(Region::Euw1, 10).unwrap().new_players_added, 3);
        let again = seeder.seed(Region::Euw1, 10).unwrap();
        assert_eq!(again.unique_identifiers_seen, 3);
        assert_eq!(again.new_players_added, 0);
        assert_eq!(db.list_players().unwrap().len(), 3);
    }

    #[test]
    fn takes_first_new_identifiers_in_discovery_order() {
        let (_dir, db) = setup();
        store_match(&db, "OLD", 1_000, &["z", "y"]);
        store_match(&db, "NEW", 2_000, &["a", "b", "a"]);

        let report = seeder_over(db.clone()).seed(Region::Euw1, 3).unwrap();
        assert_eq!(report.matches_analyzed, 2);
        assert_eq!(report.unique_identifiers_seen, 4);
        assert_eq!(report.new_players_added, 3);

        let ids: Vec<_> = db
            .list_players()
            .unwrap()
            .into_iter()
            .map(|p| p.identifier)
            .collect();
        assert_eq!(ids, vec!["a", "b", "z"]);
    }

    #[test]
    fn other_platforms_do_not_contribute() {
        let (_dir, db) = setup();
        db.store_match(&MatchSummary {
            match_id: "KR_1".into(),
            platform_id: "KR".into(),
            game_creation: 1,
            participants: vec!["k".into()],
        })
        .unwrap();
        let report = seeder_over(db.clone()).seed(Region::Euw1, 5).unwrap();
        assert_eq!(report, SeedReport::default());
    }

    #[test]
    fn zero_count_is_rejected() {
        let (_dir, db) = setup();
        let err = seeder_over(db).seed(Region::Euw1, 0).unwrap_err();
        assert!(matches!(err, CrawlError::Validation(_)));
    }

    /// A store whose uniqueness check races with another writer: it reports
    /// nothing as known, then rejects one insert as a duplicate.
    struct RacingStore {
        inner: Arc<CrawlDb>,
        taken: String,
    }

    impl PlayerRecordStore for RacingStore {
        fn insert_pending(&self, identifier: &str, region: Region) -> Result<DiscoveredPlayer> {
            if identifier == self.taken {
                return Err(CrawlError::DuplicateIdentifier(identifier.to_string()));
            }
            self.inner.insert_pending(identifier, region)
        }
        fn list_pending(&self) -> Result<Vec<DiscoveredPlayer>> {
            self.inner.list_pending()
        }
        fn update_status(&self, id: Uuid, update: &StatusUpdate) -> Result<DiscoveredPlayer> {
            self.inner.update_status(id, update)
        }
        fn list_known_identifiers(&self, _: &[String]) -> Result<HashSet<String>> {
            Ok(HashSet::new())
        }
        fn count_by_status(&self) -> Result<QueueStatus> {
            self.inner.count_by_status()
        }
        fn reset_failed(&self) -> Result<usize> {
            self.inner.reset_failed()
        }
        fn requeue_due(&self, now: DateTime<Utc>, max: u32) -> Result<usize> {
            self.inner.requeue_due(now, max)
        }
        fn recover_interrupted(&self) -> Result<usize> {
            self.inner.recover_interrupted()
        }
    }

    #[test]
    fn duplicate_insert_is_skipped_and_batch_continues() {
        let (_dir, db) = setup();
        store_match(&db, "M1", 1_000, &["a", "b", "c"]);
        let store = Arc::new(RacingStore {
            inner: db.clone(),
            taken: "b".into(),
        });
        let seeder = Seeder::new(db.clone(), store, &SeedConfig::default());

        let report = seeder.seed(Region::Euw1, 10).unwrap();
        assert_eq!(report.new_players_added, 2);
        assert!(db.find_player("c").unwrap().is_some());
        assert!(db.find_player("b").unwrap().is_none());
    }
}
