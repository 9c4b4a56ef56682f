use crate::error::{CrawlError, Result};
use crate::paths;
use crate::types::Region;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_RIOT_API_KEY: &str = "RIOT_API_KEY";
pub const ENV_ADMIN_TOKEN: &str = "CRAWLER_ADMIN_TOKEN";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// RiotConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiotConfig {
    /// Usually supplied through `RIOT_API_KEY` rather than written to disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Replaces `https://{routing}.api.riotgames.com` for every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

impl Default for RiotConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// SeedConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_region")]
    pub default_region: String,
    #[serde(default = "default_seed_count")]
    pub default_count: u32,
    /// How many of the most recent stored matches are scanned for participants.
    #[serde(default = "default_recent_match_window")]
    pub recent_match_window: usize,
    /// Cap on registered users read when no matches exist for the platform.
    #[serde(default = "default_fallback_user_limit")]
    pub fallback_user_limit: usize,
}

fn default_region() -> String {
    "euw1".to_string()
}

fn default_seed_count() -> u32 {
    20
}

fn default_recent_match_window() -> usize {
    100
}

fn default_fallback_user_limit() -> usize {
    50
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            default_count: default_seed_count(),
            recent_match_window: default_recent_match_window(),
            fallback_user_limit: default_fallback_user_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// FailedPolicy / ProcessConfig
// ---------------------------------------------------------------------------

/// What happens to a player row after its crawl fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailedPolicy {
    /// Failed rows stay failed until an operator resets them.
    #[default]
    Manual,
    /// Failed rows are re-queued by the next processor run once their backoff
    /// has elapsed, up to `max_attempts` failures.
    Retry { max_attempts: u32, backoff_secs: u64 },
}

impl FailedPolicy {
    /// Backoff before the `attempt`-th retry (1-based), doubling each time.
    pub fn backoff_for(&self, attempt: u32) -> Option<Duration> {
        match self {
            FailedPolicy::Manual => None,
            FailedPolicy::Retry { backoff_secs, .. } => {
                let exp = attempt.saturating_sub(1).min(16);
                Some(Duration::from_secs(backoff_secs.saturating_mul(1u64 << exp)))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Number of match ids requested per player.
    #[serde(default = "default_collection_size")]
    pub collection_size: u32,
    #[serde(default)]
    pub failed_policy: FailedPolicy,
    /// Pause between two players of one run, to stay under the API rate limit.
    #[serde(default = "default_player_delay_ms")]
    pub player_delay_ms: u64,
}

fn default_collection_size() -> u32 {
    20
}

fn default_player_delay_ms() -> u64 {
    500
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            collection_size: default_collection_size(),
            failed_policy: FailedPolicy::default(),
            player_delay_ms: default_player_delay_ms(),
        }
    }
}

impl ProcessConfig {
    pub fn player_delay(&self) -> Duration {
        Duration::from_millis(self.player_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_pipeline_seed_count")]
    pub seed_count: u32,
    #[serde(default = "default_max_external_calls")]
    pub max_external_calls_per_cycle: u32,
    #[serde(default = "default_cycle_pause_ms")]
    pub cycle_pause_ms: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_pipeline_seed_count() -> u32 {
    50
}

fn default_max_external_calls() -> u32 {
    50
}

fn default_cycle_pause_ms() -> u64 {
    1000
}

fn default_log_capacity() -> usize {
    50
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed_count: default_pipeline_seed_count(),
            max_external_calls_per_cycle: default_max_external_calls(),
            cycle_pause_ms: default_cycle_pause_ms(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl PipelineConfig {
    pub fn cycle_pause(&self) -> Duration {
        Duration::from_millis(self.cycle_pause_ms)
    }
}

// ---------------------------------------------------------------------------
// SyncConfig / ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Accounts refreshed more recently than this are not re-fetched.
    #[serde(default = "default_freshness_hours")]
    pub account_freshness_hours: u64,
}

fn default_freshness_hours() -> u64 {
    6
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            account_freshness_hours: default_freshness_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            admin_token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CrawlerConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub riot: RiotConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            db_path: None,
            riot: RiotConfig::default(),
            seed: SeedConfig::default(),
            process: ProcessConfig::default(),
            pipeline: PipelineConfig::default(),
            sync: SyncConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CrawlError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: CrawlerConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(CrawlError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::write_atomic(&path, data.as_bytes())
    }

    /// Overlay secrets from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_RIOT_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.riot.api_key = Some(key);
        }
        if let Some(token) = lookup(ENV_ADMIN_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.server.admin_token = Some(token);
        }
    }

    pub fn resolved_db_path(&self, root: &Path) -> PathBuf {
        match &self.db_path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => paths::db_path(root),
        }
    }

    pub fn default_region(&self) -> Result<Region> {
        self.seed.default_region.parse()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.default_region().is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "seed.default_region '{}' is not a known platform",
                    self.seed.default_region
                ),
            });
        }

        if self.riot.api_key.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "no Riot API key configured; set {ENV_RIOT_API_KEY} before starting the pipeline"
                ),
            });
        }

        if self.pipeline.log_capacity == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "pipeline.log_capacity must be at least 1".to_string(),
            });
        }

        if self.seed.default_count == 0 || self.pipeline.seed_count == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "seed counts must be positive".to_string(),
            });
        }

        if self.pipeline.cycle_pause_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "pipeline.cycle_pause_ms is 0; cycles will run back to back".to_string(),
            });
        }

        if let FailedPolicy::Retry { max_attempts, .. } = self.process.failed_policy {
            if max_attempts == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "process.failed_policy retry with max_attempts=0 never retries"
                        .to_string(),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = CrawlerConfig::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: CrawlerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.seed.default_region, "euw1");
        assert_eq!(parsed.pipeline.log_capacity, 50);
        assert_eq!(parsed.process.failed_policy, FailedPolicy::Manual);
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let cfg: CrawlerConfig = serde_yaml::from_str("version: 1\n").unwrap();
        assert_eq!(cfg.pipeline.seed_count, 50);
        assert_eq!(cfg.pipeline.max_external_calls_per_cycle, 50);
        assert_eq!(cfg.process.collection_size, 20);
        assert_eq!(cfg.process.player_delay(), Duration::from_millis(500));
        assert_eq!(cfg.seed.recent_match_window, 100);
    }

    #[test]
    fn retry_policy_yaml_tagged() {
        let yaml = "type: retry\nmax_attempts: 3\nbackoff_secs: 60\n";
        let policy: FailedPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            policy,
            FailedPolicy::Retry {
                max_attempts: 3,
                backoff_secs: 60
            }
        );
    }

    #[test]
    fn retry_backoff_doubles() {
        let policy = FailedPolicy::Retry {
            max_attempts: 5,
            backoff_secs: 30,
        };
        assert_eq!(policy.backoff_for(1), Some(Duration::from_secs(30)));
        assert_eq!(policy.backoff_for(3), Some(Duration::from_secs(120)));
        assert_eq!(FailedPolicy::Manual.backoff_for(1), None);
    }

    #[test]
    fn load_missing_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        let err = CrawlerConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, CrawlError::NotInitialized));
        let cfg = CrawlerConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.server.port, 3141);
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = CrawlerConfig::default();
        cfg.seed.default_region = "kr".to_string();
        cfg.save(dir.path()).unwrap();
        let loaded = CrawlerConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.seed.default_region, "kr");
    }

    #[test]
    fn env_overrides_secrets() {
        let mut cfg = CrawlerConfig::default();
        cfg.apply_env_from(|key| match key {
            ENV_RIOT_API_KEY => Some("RGAPI-test".to_string()),
            ENV_ADMIN_TOKEN => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.riot.api_key.as_deref(), Some("RGAPI-test"));
        assert!(cfg.server.admin_token.is_none());
    }

    #[test]
    fn relative_db_path_is_rooted() {
        let mut cfg = CrawlerConfig::default();
        cfg.db_path = Some(PathBuf::from("data/crawl.redb"));
        assert_eq!(
            cfg.resolved_db_path(Path::new("/srv")),
            PathBuf::from("/srv/data/crawl.redb")
        );
    }

    #[test]
    fn validate_flags_unknown_region_and_missing_key() {
        let mut cfg = CrawlerConfig::default();
        cfg.seed.default_region = "atlantis".to_string();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("atlantis")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains(ENV_RIOT_API_KEY)));
    }
}
