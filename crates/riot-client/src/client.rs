use std::time::Duration;

use crawler_core::config::RiotConfig;
use crawler_core::history::MatchSummary;
use crawler_core::types::Routing;
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Result, RiotError};

const API_KEY_HEADER: &str = "X-Riot-Token";
const MAX_BACKOFF: Duration = Duration::from_secs(60);

// ─── DTOs ────────────────────────────────────────────────────────────────

/// The parts of a match-v5 `MatchDto` the crawler keeps.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchDto {
    pub metadata: MatchMetadata,
    pub info: MatchInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub match_id: String,
    /// Participant PUUIDs.
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub game_creation: i64,
    pub platform_id: String,
}

impl MatchDto {
    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            match_id: self.metadata.match_id.clone(),
            platform_id: self.info.platform_id.to_ascii_uppercase(),
            game_creation: self.info.game_creation,
            participants: self.metadata.participants.clone(),
        }
    }
}

/// account-v1 `AccountDto`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub puuid: String,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub tag_line: Option<String>,
}

// ─── RiotClient ──────────────────────────────────────────────────────────

/// Thin Riot API client: authentication, retry on 429 and 5xx, 404 as
/// [`RiotError::NotFound`].
#[derive(Clone)]
pub struct RiotClient {
    http: reqwest::Client,
    api_key: String,
    base_url: Option<String>,
    /// Retries after the first attempt.
    max_retries: u32,
    initial_backoff: Duration,
}

impl std::fmt::Debug for RiotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiotClient")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl RiotClient {
    pub fn from_config(config: &RiotConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(RiotError::MissingApiKey)?
            .to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key,
            base_url: config
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        })
    }

    fn regional_url(&self, routing: Routing, path: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{base}{path}"),
            None => format!("https://{}.api.riotgames.com{path}", routing.as_str()),
        }
    }

    /// match-v5: most recent match ids for a player, newest first.
    pub async fn match_ids_by_puuid(
        &self,
        puuid: &str,
        routing: Routing,
        count: u32,
    ) -> Result<Vec<String>> {
        let url = self.regional_url(
            routing,
            &format!("/lol/match/v5/matches/by-puuid/{puuid}/ids?start=0&count={count}"),
        );
        self.get_json(&url).await
    }

    /// match-v5: one match by id.
    pub async fn match_by_id(&self, match_id: &str, routing: Routing) -> Result<MatchDto> {
        let url = self.regional_url(routing, &format!("/lol/match/v5/matches/{match_id}"));
        self.get_json(&url).await
    }

    /// account-v1: Riot id for a PUUID.
    pub async fn account_by_puuid(&self, puuid: &str, routing: Routing) -> Result<AccountDto> {
        let url = self.regional_url(
            routing,
            &format!("/riot/account/v1/accounts/by-puuid/{puuid}"),
        );
        self.get_json(&url).await
    }

    fn backoff(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let wait = match retry_after_secs {
            Some(secs) => Duration::from_secs(secs),
            None => {
                let exp = attempt.saturating_sub(1).min(16);
                self.initial_backoff.saturating_mul(1u32 << exp)
            }
        };
        wait.min(MAX_BACKOFF)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let can_retry = attempt <= self.max_retries;
            debug!(url, attempt, "riot request");

            let resp = match self
                .http
                .get(url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() && can_retry => {
                    let wait = self.backoff(attempt, None);
                    warn!(
                        url,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "request timed out, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = resp.status();
            if status.is_success() {
                return Ok(resp.json::<T>().await?);
            }

            match status.as_u16() {
                404 => return Err(RiotError::NotFound(url.to_string())),
                429 => {
                    if !can_retry {
                        return Err(RiotError::RateLimited { attempts: attempt });
                    }
                    let retry_after = resp
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok());
                    let wait = self.backoff(attempt, retry_after);
                    warn!(
                        url,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                code if code >= 500 && can_retry => {
                    let wait = self.backoff(attempt, None);
                    warn!(
                        url,
                        status = code,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "server error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                code => {
                    let message = resp.text().await.unwrap_or_default();
                    return Err(RiotError::Status {
                        status: code,
                        message,
                    });
                }
            }
        }
    }
}
