//! Persistent crawl storage using redb.
//!
//! # Table design
//!
//! One database file holds every table the crawler owns:
//!
//! ```text
//! players             uuid (16 bytes)                  -> JSON DiscoveredPlayer
//! player_identifiers  identifier                       -> uuid (16 bytes)
//! matches             [ game_creation_ms: u64 BE | match_id ] -> JSON MatchSummary
//! match_ids           match_id                         -> game_creation_ms
//! users               identifier                       -> JSON RegisteredUser
//! accounts            identifier                       -> JSON LeagueAccount
//! ```
//!
//! `player_identifiers` is written in the same transaction as `players`, so
//! the uniqueness check and the insert cannot interleave with another
//! writer. The `matches` key puts the creation time in the high bytes, so a
//! reverse scan yields newest-first without sorting.

mod accounts;
mod matches;
mod players;

use std::path::Path;

use redb::{Database, TableDefinition};

use crate::error::{CrawlError, Result};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const PLAYERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("players");
const PLAYER_IDENTIFIERS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("player_identifiers");
const MATCHES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("matches");
const MATCH_IDS: TableDefinition<&str, u64> = TableDefinition::new("match_ids");
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

pub(crate) fn db_err(e: impl std::fmt::Display) -> CrawlError {
    CrawlError::Db(e.to_string())
}

// ---------------------------------------------------------------------------
// CrawlDb
// ---------------------------------------------------------------------------

/// The crawler's redb database.
pub struct CrawlDb {
    db: Database,
}

impl CrawlDb {
    /// Open or create the database at `path`, creating every table.
    pub fn open(path: &Path) -> Result<Self> {
        crate::io::ensure_parent(path)?;
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(PLAYERS).map_err(db_err)?;
        wt.open_table(PLAYER_IDENTIFIERS).map_err(db_err)?;
        wt.open_table(MATCHES).map_err(db_err)?;
        wt.open_table(MATCH_IDS).map_err(db_err)?;
        wt.open_table(USERS).map_err(db_err)?;
        wt.open_table(ACCOUNTS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::CrawlDb;
    use tempfile::TempDir;

    pub fn open_tmp() -> (TempDir, CrawlDb) {
        let dir = TempDir::new().unwrap();
        let db = CrawlDb::open(&dir.path().join("crawl.redb")).unwrap();
        (dir, db)
    }
}
