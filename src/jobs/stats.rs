//! Crawler configuration and job statistics snapshot

use crate::config::CrawlOptions;
use crate::state::CrawlStatus;
use serde::Serialize;
use std::collections::BTreeMap;

/// Engine configuration plus job counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlerStats {
    /// Request timeout in seconds
    pub timeout: u64,
    pub max_redirects: usize,
    pub user_agent: String,
    pub check_broken_links: bool,
    pub max_links_to_check: usize,
    pub concurrent_checks: usize,
    pub respect_robots_txt: bool,

    /// Jobs not yet Completed/Failed
    pub active_jobs: usize,

    /// Every job currently held by the registry
    pub total_jobs: usize,

    /// Only statuses with at least one job appear
    pub job_status_counts: BTreeMap<CrawlStatus, usize>,
}

impl CrawlerStats {
    pub(crate) fn new(
        options: &CrawlOptions,
        total_jobs: usize,
        job_status_counts: BTreeMap<CrawlStatus, usize>,
    ) -> Self {
        let active_jobs = job_status_counts
            .iter()
            .filter(|(status, _)| status.is_active())
            .map(|(_, count)| count)
            .sum();

        Self {
            timeout: options.timeout_secs,
            max_redirects: options.max_redirects,
            user_agent: options.user_agent.clone(),
            check_broken_links: options.check_broken_links,
            max_links_to_check: options.max_links_to_check,
            concurrent_checks: options.concurrent_checks,
            respect_robots_txt: options.respect_robots_txt,
            active_jobs,
            total_jobs,
            job_status_counts,
        }
    }
}
