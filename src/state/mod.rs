//! State module for tracking crawl jobs
//!
//! # Components
//!
//! - `CrawlStatus`: The per-job state machine (started, fetching, ..., completed, failed)
//! - `CrawlJob`: The orchestrator-owned record of one crawl execution

mod crawl_status;
mod job;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use job::CrawlJob;
