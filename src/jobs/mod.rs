//! Job orchestration
//!
//! This module runs crawls as tracked background jobs:
//! - A lock-guarded registry of jobs keyed by URL record id
//! - Start/stop/status/cleanup operations with panic isolation
//! - Configuration and job-count statistics

mod registry;
mod service;
mod stats;

pub use registry::{JobRegistry, Registration};
pub use service::{CrawlerService, JOB_RETENTION_HOURS};
pub use stats::CrawlerStats;
