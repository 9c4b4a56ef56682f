use crawler_core::CrawlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiotError {
    #[error("RIOT_API_KEY is not configured")]
    MissingApiKey,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Riot API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] CrawlError),
}

impl From<RiotError> for CrawlError {
    fn from(e: RiotError) -> Self {
        match e {
            RiotError::MissingApiKey => {
                CrawlError::Configuration("RIOT_API_KEY is not configured".to_string())
            }
            RiotError::Store(inner) => inner,
            other => CrawlError::External(other.to_string()),
        }
    }
}
