//! Background crawl pipeline.
//!
//! [`Orchestrator`] runs seed, process and sync steps in a loop until
//! stopped, keeping a small in-memory [`PipelineState`] with a bounded
//! activity log. Nothing here is persisted across restarts.

pub mod activity;
pub mod control;
pub mod state;
pub mod steps;

pub use activity::{ActivityEntry, ActivityLog};
pub use control::{Orchestrator, StartOutcome};
pub use state::{PipelineSnapshot, PipelineState, StartParams};
pub use steps::{CrawlPipeline, PipelineSteps};
