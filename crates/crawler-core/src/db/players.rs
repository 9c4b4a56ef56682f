use std::collections::HashSet;

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use uuid::Uuid;

use super::{db_err, CrawlDb, PLAYERS, PLAYER_IDENTIFIERS};
use crate::error::{CrawlError, Result};
use crate::player::{DiscoveredPlayer, QueueStatus, StatusUpdate};
use crate::store::PlayerRecordStore;
use crate::types::{CrawlStatus, Region};

impl CrawlDb {
    /// Every player row, oldest first.
    pub fn list_players(&self) -> Result<Vec<DiscoveredPlayer>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(PLAYERS).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            let player: DiscoveredPlayer = serde_json::from_slice(v.value())?;
            result.push(player);
        }
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    pub fn find_player(&self, identifier: &str) -> Result<Option<DiscoveredPlayer>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let ids = rt.open_table(PLAYER_IDENTIFIERS).map_err(db_err)?;
        let Some(id_bytes) = ids.get(identifier).map_err(db_err)?.map(|g| g.value().to_vec())
        else {
            return Ok(None);
        };
        let players = rt.open_table(PLAYERS).map_err(db_err)?;
        let found = players
            .get(id_bytes.as_slice())
            .map_err(db_err)?
            .map(|g| serde_json::from_slice::<DiscoveredPlayer>(g.value()))
            .transpose()?;
        Ok(found)
    }

    /// Rewrite every row matching `select` through `change`. Returns the count.
    fn rewrite_where<S, C>(&self, select: S, change: C) -> Result<usize>
    where
        S: Fn(&DiscoveredPlayer) -> bool,
        C: Fn(&mut DiscoveredPlayer),
    {
        let wt = self.db.begin_write().map_err(db_err)?;
        let count;
        {
            let mut table = wt.open_table(PLAYERS).map_err(db_err)?;
            let mut selected = Vec::new();
            for entry in table.iter().map_err(db_err)? {
                let (_, v) = entry.map_err(db_err)?;
                let player: DiscoveredPlayer = serde_json::from_slice(v.value())?;
                if select(&player) {
                    selected.push(player);
                }
            }
            count = selected.len();
            for mut player in selected {
                change(&mut player);
                let value = serde_json::to_vec(&player)?;
                table
                    .insert(player.id.as_bytes().as_slice(), value.as_slice())
                    .map_err(db_err)?;
            }
        }
        wt.commit().map_err(db_err)?;
        Ok(count)
    }
}

fn back_to_pending(player: &mut DiscoveredPlayer) {
    player.crawl_status = CrawlStatus::Pending;
    player.next_eligible_at = None;
}

impl PlayerRecordStore for CrawlDb {
    fn insert_pending(&self, identifier: &str, region: Region) -> Result<DiscoveredPlayer> {
        let player = DiscoveredPlayer::new_pending(identifier, region);
        let value = serde_json::to_vec(&player)?;

        let wt = self.db.begin_write().map_err(db_err)?;
        let duplicate = {
            let ids = wt.open_table(PLAYER_IDENTIFIERS).map_err(db_err)?;
            let found = ids.get(identifier).map_err(db_err)?.is_some();
            found
        };
        if duplicate {
            wt.abort().map_err(db_err)?;
            return Err(CrawlError::DuplicateIdentifier(identifier.to_string()));
        }
        {
            let mut ids = wt.open_table(PLAYER_IDENTIFIERS).map_err(db_err)?;
            ids.insert(identifier, player.id.as_bytes().as_slice())
                .map_err(db_err)?;
            let mut players = wt.open_table(PLAYERS).map_err(db_err)?;
            players
                .insert(player.id.as_bytes().as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(player)
    }

    fn list_pending(&self) -> Result<Vec<DiscoveredPlayer>> {
        let mut pending = self.list_players()?;
        pending.retain(|p| p.crawl_status == CrawlStatus::Pending);
        Ok(pending)
    }

    fn update_status(&self, id: Uuid, update: &StatusUpdate) -> Result<DiscoveredPlayer> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let player = {
            let mut table = wt.open_table(PLAYERS).map_err(db_err)?;
            let existing = table
                .get(id.as_bytes().as_slice())
                .map_err(db_err)?
                .map(|g| g.value().to_vec());
            let Some(bytes) = existing else {
                drop(table);
                wt.abort().map_err(db_err)?;
                return Err(CrawlError::PlayerNotFound(id.to_string()));
            };
            let mut player: DiscoveredPlayer = serde_json::from_slice(&bytes)?;
            player.apply(update);
            let value = serde_json::to_vec(&player)?;
            table
                .insert(id.as_bytes().as_slice(), value.as_slice())
                .map_err(db_err)?;
            player
        };
        wt.commit().map_err(db_err)?;
        Ok(player)
    }

    fn list_known_identifiers(&self, candidates: &[String]) -> Result<HashSet<String>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let ids = rt.open_table(PLAYER_IDENTIFIERS).map_err(db_err)?;
        let mut known = HashSet::new();
        for candidate in candidates {
            if ids.get(candidate.as_str()).map_err(db_err)?.is_some() {
                known.insert(candidate.clone());
            }
        }
        Ok(known)
    }

    fn count_by_status(&self) -> Result<QueueStatus> {
        let mut counts = QueueStatus::default();
        for player in self.list_players()? {
            counts.record(player.crawl_status);
        }
        Ok(counts)
    }

    fn reset_failed(&self) -> Result<usize> {
        self.rewrite_where(
            |p| p.crawl_status == CrawlStatus::Failed,
            |p| {
                back_to_pending(p);
                p.retry_count = 0;
            },
        )
    }

    fn requeue_due(&self, now: DateTime<Utc>, max_attempts: u32) -> Result<usize> {
        self.rewrite_where(|p| p.retry_due(now, max_attempts), back_to_pending)
    }

    fn recover_interrupted(&self) -> Result<usize> {
        self.rewrite_where(
            |p| p.crawl_status == CrawlStatus::Crawling,
            back_to_pending,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
