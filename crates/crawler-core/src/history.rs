//! Stored match history and registered users: the raw material the seeder
//! mines for new identifiers.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Region;

/// The slice of a stored match the crawler cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: String,
    /// Upper-case platform id as reported by match-v5 (`EUW1`).
    pub platform_id: String,
    /// Milliseconds since the epoch.
    pub game_creation: i64,
    pub participants: Vec<String>,
}

/// An application user who linked a Riot account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub identifier: String,
    pub region: Region,
}

/// A distinct participant across stored matches, with how often it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantTally {
    pub identifier: String,
    pub platform_id: String,
    pub matches: u32,
}

/// Where the seeder looks for candidate identifiers.
pub trait SeedSource: Send + Sync {
    /// Most recent matches for `platform_id`, newest first.
    fn recent_matches(&self, platform_id: &str, limit: usize) -> Result<Vec<MatchSummary>>;

    /// Identifiers of registered users in `region`.
    fn registered_identifiers(&self, region: Region, limit: usize) -> Result<Vec<String>>;
}
