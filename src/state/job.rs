//! Crawl job record owned by the orchestrator

use crate::crawler::CrawlJobResult;
use crate::state::CrawlStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One asynchronous execution of a crawl against a single URL record
///
/// Values handed out by [`crate::jobs::CrawlerService`] are snapshots. The
/// cancellation handle of a running job stays inside the registry, so nothing
/// done to a snapshot can reach the live job.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlJob {
    /// Identifier of the persisted URL record this job crawls
    pub id: i64,
    pub url: String,
    pub status: CrawlStatus,
    /// Percentage in `[0, 100]`
    pub progress: f64,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Present exactly when `status` is terminal
    pub result: Option<CrawlJobResult>,
}

impl CrawlJob {
    /// Creates a job in the `Started` state
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            status: CrawlStatus::Started,
            progress: 0.0,
            message: "Crawl queued".to_string(),
            start_time: Utc::now(),
            end_time: None,
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies an engine progress report
    ///
    /// Terminal statuses and reports against a finished job are ignored.
    /// Returns whether the job changed.
    pub fn apply_progress(&mut self, status: CrawlStatus, message: &str, progress: f64) -> bool {
        if self.is_terminal() || status.is_terminal() {
            return false;
        }
        self.status = status;
        self.message = message.to_string();
        self.progress = progress.clamp(self.progress, 100.0);
        true
    }

    /// Moves the job into a terminal state together with its result
    pub fn finish(&mut self, status: CrawlStatus, message: impl Into<String>, result: CrawlJobResult) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.message = message.into();
        self.progress = 100.0;
        self.end_time = Some(Utc::now());
        self.result = Some(result);
    }

    /// Time the job has been running, or ran for if finished
    pub fn elapsed(&self) -> chrono::Duration {
        self.end_time.unwrap_or_else(Utc::now) - self.start_time
    }
}
