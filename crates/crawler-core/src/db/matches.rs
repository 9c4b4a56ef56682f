use std::collections::BTreeMap;

use redb::{ReadableTable, ReadableTableMetadata};

use super::{db_err, CrawlDb, MATCHES, MATCH_IDS, USERS};
use crate::error::Result;
use crate::history::{MatchSummary, ParticipantTally, RegisteredUser, SeedSource};
use crate::types::Region;

fn match_key(game_creation: i64, match_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + match_id.len());
    key.extend_from_slice(&(game_creation.max(0) as u64).to_be_bytes());
    key.extend_from_slice(match_id.as_bytes());
    key
}

impl CrawlDb {
    /// Store a match. Returns `false` when the match id was already stored.
    pub fn store_match(&self, summary: &MatchSummary) -> Result<bool> {
        let value = serde_json::to_vec(summary)?;
        let key = match_key(summary.game_creation, &summary.match_id);

        let wt = self.db.begin_write().map_err(db_err)?;
        let inserted = {
            let mut ids = wt.open_table(MATCH_IDS).map_err(db_err)?;
            if ids.get(summary.match_id.as_str()).map_err(db_err)?.is_some() {
                false
            } else {
                ids.insert(
                    summary.match_id.as_str(),
                    summary.game_creation.max(0) as u64,
                )
                .map_err(db_err)?;
                let mut matches = wt.open_table(MATCHES).map_err(db_err)?;
                matches
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(db_err)?;
                true
            }
        };
        wt.commit().map_err(db_err)?;
        Ok(inserted)
    }

    pub fn has_match(&self, match_id: &str) -> Result<bool> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let ids = rt.open_table(MATCH_IDS).map_err(db_err)?;
        Ok(ids.get(match_id).map_err(db_err)?.is_some())
    }

    pub fn match_count(&self) -> Result<u64> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let ids = rt.open_table(MATCH_IDS).map_err(db_err)?;
        ids.len().map_err(db_err)
    }

    /// Register (or re-register) an application user.
    pub fn register_user(&self, user: &RegisteredUser) -> Result<()> {
        let value = serde_json::to_vec(user)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(USERS).map_err(db_err)?;
            table
                .insert(user.identifier.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// Every distinct participant across stored matches, ordered by
    /// identifier. The platform is taken from the newest match it appears in.
    pub fn distinct_participants(&self) -> Result<Vec<ParticipantTally>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(MATCHES).map_err(db_err)?;

        let mut tallies: BTreeMap<String, ParticipantTally> = BTreeMap::new();
        for entry in table.iter().map_err(db_err)?.rev() {
            let (_, v) = entry.map_err(db_err)?;
            let summary: MatchSummary = serde_json::from_slice(v.value())?;
            for identifier in summary.participants {
                tallies
                    .entry(identifier.clone())
                    .and_modify(|t| t.matches += 1)
                    .or_insert_with(|| ParticipantTally {
                        identifier,
                        platform_id: summary.platform_id.clone(),
                        matches: 1,
                    });
            }
        }
        Ok(tallies.into_values().collect())
    }
}

impl SeedSource for CrawlDb {
    fn recent_matches(&self, platform_id: &str, limit: usize) -> Result<Vec<MatchSummary>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(MATCHES).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)?.rev() {
            if result.len() >= limit {
                break;
            }
            let (_, v) = entry.map_err(db_err)?;
            let summary: MatchSummary = serde_json::from_slice(v.value())?;
            if summary.platform_id.eq_ignore_ascii_case(platform_id) {
                result.push(summary);
            }
        }
        Ok(result)
    }

    fn registered_identifiers(&self, region: Region, limit: usize) -> Result<Vec<String>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(USERS).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            if result.len() >= limit {
                break;
            }
            let (_, v) = entry.map_err(db_err)?;
            let user: RegisteredUser = serde_json::from_slice(v.value())?;
            if user.region == region {
                result.push(user.identifier);
            }
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::open_tmp;

    fn summary(id: &str, platform: &str, at: i64, participants: &[&str]) -> MatchSummary {
        MatchSummary {
            match_id: id.into(),
            platform_id: platform.into(),
            game_creation: at,
            participants: participants.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn store_match_dedupes_by_id() {
        let (_dir, db) = open_tmp();
        let m = summary("EUW1_1", "EUW1", 1_000, &["a", "b"]);
        assert!(db.store_match(&m).unwrap());
        assert!(!db.store_match(&m).unwrap());
        assert!(db.has_match("EUW1_1").unwrap());
        assert_eq!(db.match_count().unwrap(), 1);
    }

    #[test]
    fn recent_matches_are_newest_first_and_filtered() {
        let (_dir, db) = open_tmp();
        db.store_match(&summary("EUW1_1", "EUW1", 1_000, &["a"])).unwrap();
        db.store_match(&summary("EUW1_3", "EUW1", 3_000, &["c"])).unwrap();
        db.store_match(&summary("KR_2", "KR", 2_000, &["k"])).unwrap();
        db.store_match(&summary("EUW1_2", "EUW1", 2_000, &["b"])).unwrap();

        let recent = db.recent_matches("euw1", 10).unwrap();
        let ids: Vec<_> = recent.iter().map(|m| m.match_id.as_str()).collect();
        assert_eq!(ids, vec!["EUW1_3", "EUW1_2", "EUW1_1"]);

        let limited = db.recent_matches("EUW1", 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].match_id, "EUW1_3");
    }

    #[test]
    fn registered_identifiers_filter_by_region() {
        let (_dir, db) = open_tmp();
        for (id, region) in [("u1", Region::Euw1), ("u2", Region::Kr), ("u3", Region::Euw1)] {
            db.register_user(&RegisteredUser {
                identifier: id.into(),
                region,
            })
            .unwrap();
        }
        let ids = db.registered_identifiers(Region::Euw1, 50).unwrap();
        assert_eq!(ids, vec!["u1".to_string(), "u3".to_string()]);
        assert_eq!(db.registered_identifiers(Region::Euw1, 1).unwrap().len(), 1);
        assert!(db.registered_identifiers(Region::Na1, 50).unwrap().is_empty());
    }

    #[test]
    fn distinct_participants_tallies_appearances() {
        let (_dir, db) = open_tmp();
        db.store_match(&summary("M1", "EUW1", 1_000, &["a", "b"])).unwrap();
        db.store_match(&summary("M2", "KR", 2_000, &["a", "c"])).unwrap();

        let tallies = db.distinct_participants().unwrap();
        assert_eq!(tallies.len(), 3);
        assert_eq!(tallies[0].identifier, "a");
        assert_eq!(tallies[0].matches, 2);
        assert_eq!(tallies[0].platform_id, "KR");
        assert_eq!(tallies[1].platform_id, "EUW1");
    }
}
