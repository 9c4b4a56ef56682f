use redb::{ReadableTable, ReadableTableMetadata};

use super::{db_err, CrawlDb, ACCOUNTS};
use crate::account::LeagueAccount;
use crate::error::Result;

impl CrawlDb {
    pub fn get_account(&self, identifier: &str) -> Result<Option<LeagueAccount>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(ACCOUNTS).map_err(db_err)?;
        let found = table
            .get(identifier)
            .map_err(db_err)?
            .map(|g| serde_json::from_slice::<LeagueAccount>(g.value()))
            .transpose()?;
        Ok(found)
    }

    /// Insert or replace an account. Returns `true` when the row is new.
    pub fn upsert_account(&self, account: &LeagueAccount) -> Result<bool> {
        let value = serde_json::to_vec(account)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        let created = {
            let mut table = wt.open_table(ACCOUNTS).map_err(db_err)?;
            let previous = table
                .insert(account.identifier.as_str(), value.as_slice())
                .map_err(db_err)?;
            previous.is_none()
        };
        wt.commit().map_err(db_err)?;
        Ok(created)
    }

    pub fn account_count(&self) -> Result<u64> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(ACCOUNTS).map_err(db_err)?;
        table.len().map_err(db_err)
    }
}
