use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Region;

/// Account metadata reconciled from collected matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueAccount {
    pub identifier: String,
    pub region: Region,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub tag_line: Option<String>,
    pub total_matches: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last time the profile was fetched from the upstream API.
    #[serde(default)]
    pub profile_fetched_at: Option<DateTime<Utc>>,
}

impl LeagueAccount {
    pub fn new(identifier: impl Into<String>, region: Region, total_matches: u32) -> Self {
        let now = Utc::now();
        Self {
            identifier: identifier.into(),
            region,
            game_name: None,
            tag_line: None,
            total_matches,
            created_at: now,
            updated_at: now,
            profile_fetched_at: None,
        }
    }

    pub fn has_profile(&self) -> bool {
        self.game_name.is_some() || self.tag_line.is_some()
    }

    /// Whether the upstream profile should be fetched again.
    pub fn needs_profile(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        if !self.has_profile() {
            return true;
        }
        match self.profile_fetched_at {
            Some(at) => now - at >= freshness,
            None => true,
        }
    }
}
