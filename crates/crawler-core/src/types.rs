use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A Riot platform. Serialized as the lowercase platform code (`euw1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Euw1,
    Eun1,
    Tr1,
    Ru,
    Na1,
    La1,
    La2,
    Br1,
    Kr,
    Jp1,
    Oc1,
    Ph2,
    Sg2,
    Th2,
    Tw2,
    Vn2,
}

impl Region {
    pub fn all() -> &'static [Region] {
        &[
            Region::Euw1,
            Region::Eun1,
            Region::Tr1,
            Region::Ru,
            Region::Na1,
            Region::La1,
            Region::La2,
            Region::Br1,
            Region::Kr,
            Region::Jp1,
            Region::Oc1,
            Region::Ph2,
            Region::Sg2,
            Region::Th2,
            Region::Tw2,
            Region::Vn2,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Euw1 => "euw1",
            Region::Eun1 => "eun1",
            Region::Tr1 => "tr1",
            Region::Ru => "ru",
            Region::Na1 => "na1",
            Region::La1 => "la1",
            Region::La2 => "la2",
            Region::Br1 => "br1",
            Region::Kr => "kr",
            Region::Jp1 => "jp1",
            Region::Oc1 => "oc1",
            Region::Ph2 => "ph2",
            Region::Sg2 => "sg2",
            Region::Th2 => "th2",
            Region::Tw2 => "tw2",
            Region::Vn2 => "vn2",
        }
    }

    /// Platform id as stored on match records (`EUW1`).
    pub fn platform_id(self) -> &'static str {
        match self {
            Region::Euw1 => "EUW1",
            Region::Eun1 => "EUN1",
            Region::Tr1 => "TR1",
            Region::Ru => "RU",
            Region::Na1 => "NA1",
            Region::La1 => "LA1",
            Region::La2 => "LA2",
            Region::Br1 => "BR1",
            Region::Kr => "KR",
            Region::Jp1 => "JP1",
            Region::Oc1 => "OC1",
            Region::Ph2 => "PH2",
            Region::Sg2 => "SG2",
            Region::Th2 => "TH2",
            Region::Tw2 => "TW2",
            Region::Vn2 => "VN2",
        }
    }

    pub fn from_platform_id(platform_id: &str) -> Option<Region> {
        Region::all()
            .iter()
            .copied()
            .find(|r| r.platform_id().eq_ignore_ascii_case(platform_id))
    }

    /// Regional routing cluster used by match-v5 and account-v1.
    pub fn routing(self) -> Routing {
        match self {
            Region::Euw1 | Region::Eun1 | Region::Tr1 | Region::Ru => Routing::Europe,
            Region::Na1 | Region::La1 | Region::La2 | Region::Br1 => Routing::Americas,
            Region::Kr
            | Region::Jp1
            | Region::Oc1
            | Region::Ph2
            | Region::Sg2
            | Region::Th2
            | Region::Tw2
            | Region::Vn2 => Routing::Asia,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Region {
    type Err = crate::error::CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted.is_empty() {
            return Err(crate::error::CrawlError::Validation(
                "region is required".to_string(),
            ));
        }
        Region::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| crate::error::CrawlError::UnknownRegion(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Routing {
    Europe,
    Americas,
    Asia,
}

impl Routing {
    pub fn as_str(self) -> &'static str {
        match self {
            Routing::Europe => "europe",
            Routing::Americas => "americas",
            Routing::Asia => "asia",
        }
    }
}

impl fmt::Display for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CrawlStatus
// ---------------------------------------------------------------------------

/// Per-player crawl state.
///
/// Transitions: `Pending → Crawling → Completed | Failed`. Only an explicit
/// reset (or the retry policy) moves a `Failed` row back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Pending,
    Crawling,
    Completed,
    Failed,
}

impl CrawlStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CrawlStatus::Pending => "pending",
            CrawlStatus::Crawling => "crawling",
            CrawlStatus::Completed => "completed",
            CrawlStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineStep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Seed,
    Process,
    Sync,
    Idle,
}

impl PipelineStep {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::Seed => "seed",
            PipelineStep::Process => "process",
            PipelineStep::Sync => "sync",
            PipelineStep::Idle => "idle",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;

    #[test]
    fn region_parse_is_case_insensitive() {
        let r: Region = "EUW1".parse().unwrap();
        assert_eq!(r, Region::Euw1);
        let r: Region = " kr ".parse().unwrap();
        assert_eq!(r, Region::Kr);
    }

    #[test]
    fn empty_region_is_validation_error() {
        let err = "".parse::<Region>().unwrap_err();
        assert!(matches!(err, CrawlError::Validation(_)));
    }

    #[test]
    fn unknown_region_is_rejected() {
        let err = "moon1".parse::<Region>().unwrap_err();
        assert!(matches!(err, CrawlError::UnknownRegion(ref r) if r == "moon1"));
    }

    #[test]
    fn routing_clusters() {
        assert_eq!(Region::Euw1.routing(), Routing::Europe);
        assert_eq!(Region::Br1.routing(), Routing::Americas);
        assert_eq!(Region::Vn2.routing(), Routing::Asia);
    }

    #[test]
    fn platform_id_lookup_round_trips() {
        for region in Region::all() {
            assert_eq!(Region::from_platform_id(region.platform_id()), Some(*region));
        }
        assert_eq!(Region::from_platform_id("UNKNOWN"), None);
    }

    #[test]
    fn crawl_status_serializes_snake_case() {
        let json = serde_json::to_string(&CrawlStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
