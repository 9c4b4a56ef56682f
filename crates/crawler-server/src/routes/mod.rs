pub mod crawl;
pub mod health;
pub mod pipeline;
