use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Totals from one account reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub total_identifiers: usize,
    pub accounts_created: usize,
    pub accounts_updated: usize,
    /// Upstream calls spent, never more than the quota passed to `sync`.
    #[serde(default)]
    pub external_calls: u32,
}

/// Reconciles account metadata from collected matches.
#[async_trait]
pub trait AccountSyncer: Send + Sync {
    async fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn sync(&self, max_external_calls: u32) -> Result<SyncReport>;
}
