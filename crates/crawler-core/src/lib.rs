pub mod account;
pub mod collector;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod player;
pub mod processor;
pub mod seeder;
pub mod store;
pub mod sync;
pub mod types;

pub use db::CrawlDb;
pub use error::{CrawlError, Result};
