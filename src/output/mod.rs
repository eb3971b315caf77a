//! Output module for printing crawl reports and crawler statistics
//!
//! This module handles:
//! - Human-readable reports for finished crawl jobs
//! - Crawler configuration and job-count statistics
//! - JSON rendering of job snapshots

mod report;
mod stats;

pub use report::{print_job_report, render_job_json};
pub use stats::print_crawler_stats;
