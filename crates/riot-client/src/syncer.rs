use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use crawler_core::account::LeagueAccount;
use crawler_core::config::{RiotConfig, SyncConfig};
use crawler_core::sync::{AccountSyncer, SyncReport};
use crawler_core::types::Region;
use crawler_core::CrawlDb;
use tracing::{debug, info, warn};

use crate::{Result, RiotClient, RiotError};

/// [`AccountSyncer`] that upserts one account per distinct match
/// participant and fills in Riot ids through account-v1.
pub struct RiotAccountSyncer {
    client: Option<RiotClient>,
    db: Arc<CrawlDb>,
    freshness: chrono::Duration,
}

impl RiotAccountSyncer {
    /// Without an API key the syncer still reconciles match totals; it just
    /// never fetches profiles.
    pub fn new(riot: &RiotConfig, sync: &SyncConfig, db: Arc<CrawlDb>) -> Result<Self> {
        let client = match RiotClient::from_config(riot) {
            Ok(client) => Some(client),
            Err(RiotError::MissingApiKey) => None,
            Err(e) => return Err(e),
        };
        Ok(Self {
            client,
            db,
            freshness: chrono::Duration::hours(sync.account_freshness_hours as i64),
        })
    }
}

#[async_trait]
impl AccountSyncer for RiotAccountSyncer {
    async fn sync(&self, max_external_calls: u32) -> crawler_core::Result<SyncReport> {
        let participants = self.db.distinct_participants()?;
        let now = Utc::now();
        let mut report = SyncReport {
            total_identifiers: participants.len(),
            ..Default::default()
        };

        for tally in participants {
            let Some(region) = Region::from_platform_id(&tally.platform_id) else {
                debug!(platform = %tally.platform_id, "unknown platform, skipping participant");
                continue;
            };
            let existing = self.db.get_account(&tally.identifier)?;
            let mut account = existing
                .clone()
                .unwrap_or_else(|| LeagueAccount::new(&tally.identifier, region, tally.matches));
            account.region = region;
            account.total_matches = tally.matches;

            if let Some(client) = &self.client {
                if report.external_calls < max_external_calls
                    && account.needs_profile(now, self.freshness)
                {
                    report.external_calls += 1;
                    match client
                        .account_by_puuid(&tally.identifier, region.routing())
                        .await
                    {
                        Ok(dto) => {
                            account.game_name = dto.game_name;
                            account.tag_line = dto.tag_line;
                            account.profile_fetched_at = Some(now);
                        }
                        Err(e) => {
                            warn!(
                                identifier = %tally.identifier,
                                error = %e,
                                "account lookup failed"
                            )
                        }
                    }
                }
            }

            match existing {
                None => {
                    self.db.upsert_account(&account)?;
                    report.accounts_created += 1;
                }
                Some(previous) if previous != account => {
                    account.updated_at = now;
                    self.db.upsert_account(&account)?;
                    report.accounts_updated += 1;
                }
                Some(_) => {}
            }
        }

        info!(
            identifiers = report.total_identifiers,
            created = report.accounts_created,
            updated = report.accounts_updated,
            calls = report.external_calls,
            "account sync finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::config_for;
    use crawler_core::history::MatchSummary;
    use mockito::Server;
    use tempfile::TempDir;

    fn seeded_db(participants: &[&str]) -> (TempDir, Arc<CrawlDb>) {
        let dir = TempDir::new().unwrap();
        let db = CrawlDb::open(&dir.path().join("crawl.redb")).unwrap();
        db.store_match(&MatchSummary {
            match_id: "EUW1_1".into(),
            platform_id: "EUW1".into(),
            game_creation: 1_000,
            participants: participants.iter().map(|s| s.to_string()).collect(),
        })
        .unwrap();
        (dir, Arc::new(db))
    }

    #[tokio::test]
    async fn creates_accounts_and_respects_the_quota() {
        let (_dir, db) = seeded_db(&["a", "b", "c"]);
        let mut server = Server::new_async().await;
        let lookups = server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/riot/account/v1/accounts/by-puuid/\w+$".into()),
            )
            .with_status(200)
            .with_body(r#"{"puuid":"x","gameName":"Name","tagLine":"EUW"}"#)
            .expect(2)
            .create_async()
            .await;

        let syncer =
            RiotAccountSyncer::new(&config_for(&server.url()), &SyncConfig::default(), db.clone())
                .unwrap();
        let report = syncer.sync(2).await.unwrap();
        assert_eq!(report.total_identifiers, 3);
        assert_eq!(report.accounts_created, 3);
        assert_eq!(report.external_calls, 2);
        lookups.assert_async().await;

        let a = db.get_account("a").unwrap().unwrap();
        assert_eq!(a.game_name.as_deref(), Some("Name"));
        assert_eq!(a.total_matches, 1);
        assert!(db.get_account("c").unwrap().unwrap().game_name.is_none());
    }

    #[tokio::test]
    async fn fresh_profiles_are_not_fetched_again() {
        let (_dir, db) = seeded_db(&["a"]);
        let mut server = Server::new_async().await;
        let lookup = server
            .mock("GET", "/riot/account/v1/accounts/by-puuid/a")
            .with_status(200)
            .with_body(r#"{"puuid":"a","gameName":"Name","tagLine":"EUW"}"#)
            .expect(1)
            .create_async()
            .await;
        let syncer =
            RiotAccountSyncer::new(&config_for(&server.url()), &SyncConfig::default(), db.clone())
                .unwrap();

        syncer.sync(10).await.unwrap();
        let second = syncer.sync(10).await.unwrap();
        assert_eq!(second.external_calls, 0);
        assert_eq!(second.accounts_created, 0);
        assert_eq!(second.accounts_updated, 0);
        lookup.assert_async().await;
    }

    #[tokio::test]
    async fn lookup_failures_are_counted_not_propagated() {
        let (_dir, db) = seeded_db(&["a"]);
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/riot/account/v1/accounts/by-puuid/a")
            .with_status(403)
            .create_async()
            .await;
        let syncer =
            RiotAccountSyncer::new(&config_for(&server.url()), &SyncConfig::default(), db.clone())
                .unwrap();
        let report = syncer.sync(5).await.unwrap();
        assert_eq!(report.external_calls, 1);
        assert_eq!(report.accounts_created, 1);
        assert!(db.get_account("a").unwrap().unwrap().game_name.is_none());
    }

    #[tokio::test]
    async fn without_a_key_totals_are_still_reconciled() {
        let (_dir, db) = seeded_db(&["a", "b"]);
        let syncer =
            RiotAccountSyncer::new(&RiotConfig::default(), &SyncConfig::default(), db.clone())
                .unwrap();
        let report = syncer.sync(5).await.unwrap();
        assert_eq!(report.accounts_created, 2);
        assert_eq!(report.external_calls, 0);
        assert_eq!(db.account_count().unwrap(), 2);
    }
}
