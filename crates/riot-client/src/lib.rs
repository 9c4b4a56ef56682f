//! Riot Games API collaborators of the crawler.
//!
//! ```text
//! RiotClient          ← reqwest, X-Riot-Token, 429/5xx retry with backoff
//!     │
//!     ├── RiotMatchCollector   impl MatchCollector   (match-v5)
//!     └── RiotAccountSyncer    impl AccountSyncer    (account-v1)
//! ```
//!
//! Both collaborators write through `crawler_core::CrawlDb`.

pub mod client;
pub mod collector;
pub mod error;
pub mod syncer;

pub use client::{AccountDto, MatchDto, RiotClient};
pub use collector::RiotMatchCollector;
pub use error::RiotError;
pub use syncer::RiotAccountSyncer;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, RiotError>;
