use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("not initialized: run 'crawler init'")]
    NotInitialized,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("external service error: {0}")]
    External(String),

    #[error("identifier already discovered: {0}")]
    DuplicateIdentifier(String),

    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("pipeline is running; stop it before running a step by hand")]
    PipelineBusy,

    #[error("pipeline supervisor has shut down")]
    PipelineUnavailable,

    #[error("crawl database error: {0}")]
    Db(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
