//! Crawler service: runs crawl jobs in the background and tracks their state
//!
//! The service owns the job registry and one shared HTTP client. Each started
//! job gets its own [`Crawler`] whose progress callback writes into the
//! registry, runs on its own Tokio task, and persists its outcome through the
//! [`Repository`] before the job is marked terminal, so a finished job is
//! always visible in storage.

use crate::config::CrawlOptions;
use crate::crawler::{build_http_client, CrawlJobResult, Crawler};
use crate::jobs::registry::{JobRegistry, CANCELLED_MESSAGE};
use crate::jobs::stats::CrawlerStats;
use crate::state::{CrawlJob, CrawlStatus};
use crate::storage::{BrokenLinkRecord, CrawlResultRecord, Repository, StorageError, UrlStatus};
use crate::{CrawlError, JobError, Result};
use chrono::{Duration, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// How long finished jobs stay in the registry
pub const JOB_RETENTION_HOURS: i64 = 1;

const INTERNAL_ERROR_MESSAGE: &str = "Internal error during crawl";
const SUCCESS_MESSAGE: &str = "Crawl completed successfully";

/// Orchestrates crawl jobs keyed by URL record id
pub struct CrawlerService {
    repository: Arc<dyn Repository>,
    client: Client,
    options: CrawlOptions,
    registry: Arc<JobRegistry>,
}

impl CrawlerService {
    /// Creates a service with a freshly built HTTP client
    pub fn new(
        repository: Arc<dyn Repository>,
        options: CrawlOptions,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = build_http_client(&options)?;
        Ok(Self {
            repository,
            client,
            options,
            registry: Arc::new(JobRegistry::new()),
        })
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Starts a background crawl of the URL record `id`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_crawl(&self, id: i64) -> Result<()> {
        if self.registry.has_live_job(id) {
            return Err(JobError::AlreadyInProgress(id));
        }

        let record = self.repository.get_url_by_id(id).map_err(|e| match e {
            StorageError::UrlNotFound(_) => JobError::NotFound(id),
            source => JobError::LookupFailed { id, source },
        })?;

        self.repository
            .update_url_status(id, UrlStatus::Running, None)?;

        let owner = self
            .registry
            .try_register(CrawlJob::new(id, record.url.clone()))?;
        let run = owner.run;

        tracing::info!("Starting crawl job {} for {}", id, record.url);

        let crawler = Crawler::with_client(self.client.clone(), self.options.clone());
        let registry = Arc::clone(&self.registry);
        crawler.set_progress_callback(Arc::new(
            move |status: CrawlStatus, message: &str, progress: f64| {
                if registry.apply_progress(id, run, status, message, progress) {
                    tracing::debug!("Job {}: {} ({:.0}%) {}", id, status, progress, message);
                }
            },
        ));

        let url = record.url.clone();
        let token = owner.cancel;
        let crawl = async move { crawler.crawl_url_with_cancel(&url, &token).await };

        let ctx = JobContext {
            id,
            url: record.url,
            run,
            registry: Arc::clone(&self.registry),
            repository: Arc::clone(&self.repository),
        };
        supervise(ctx, crawl);

        Ok(())
    }

    /// Cancels a running job and marks it failed
    pub fn stop_crawl(&self, id: i64) -> Result<()> {
        self.registry.stop(id)?;
        tracing::info!("Crawl job {} cancelled by user", id);

        if let Err(e) =
            self.repository
                .update_url_status(id, UrlStatus::Error, Some(CANCELLED_MESSAGE))
        {
            tracing::warn!("Failed to update URL status for cancelled job {}: {}", id, e);
        }
        Ok(())
    }

    /// Snapshot of one job
    pub fn get_job_status(&self, id: i64) -> Result<CrawlJob> {
        self.registry.get(id).ok_or(JobError::NotFound(id))
    }

    /// Snapshots of all jobs that have not reached a terminal state
    pub fn get_active_jobs(&self) -> HashMap<i64, CrawlJob> {
        self.registry.active_jobs()
    }

    pub fn get_crawler_stats(&self) -> CrawlerStats {
        let (total, counts) = self.registry.status_counts();
        CrawlerStats::new(&self.options, total, counts)
    }

    /// Drops finished jobs older than the retention window
    ///
    /// Returns the number of jobs removed.
    pub fn cleanup_completed_jobs(&self) -> usize {
        let cutoff = Utc::now() - Duration::hours(JOB_RETENTION_HOURS);
        let removed = self.registry.remove_finished_before(cutoff);
        if removed > 0 {
            tracing::debug!("Removed {} finished crawl jobs", removed);
        }
        removed
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &JobRegistry {
        &self.registry
    }
}

/// Everything a background crawl needs to record its outcome
struct JobContext {
    id: i64,
    url: String,
    run: u64,
    registry: Arc<JobRegistry>,
    repository: Arc<dyn Repository>,
}

/// Runs `crawl` on its own task and records the outcome
///
/// A panic inside the crawl is caught at the inner task boundary and turned
/// into a failed job.
fn supervise<F>(ctx: JobContext, crawl: F) -> JoinHandle<()>
where
    F: Future<Output = CrawlJobResult> + Send + 'static,
{
    tokio::spawn(async move {
        let result = match tokio::spawn(crawl).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_panic() {
                    tracing::error!("Panic in crawl job {}", ctx.id);
                } else {
                    tracing::error!("Crawl job {} was aborted: {}", ctx.id, e);
                }
                CrawlJobResult::failed(
                    ctx.url.clone(),
                    CrawlError::Internal(INTERNAL_ERROR_MESSAGE.to_string()),
                )
            }
        };

        complete_job(&ctx, result);
    })
}

fn failure_message(error: &CrawlError) -> String {
    match error {
        CrawlError::Internal(detail) => detail.clone(),
        other => other.to_string(),
    }
}

/// Persists the outcome, then finishes the registry entry
///
/// Nothing is persisted when the run no longer owns the job, e.g. it was
/// stopped by the user. A crawl that returns `Cancelled` without a stop is
/// recorded as an ordinary failure.
fn complete_job(ctx: &JobContext, result: CrawlJobResult) {
    let (status, message) = match &result.error {
        None => (CrawlStatus::Completed, SUCCESS_MESSAGE.to_string()),
        Some(error) => (CrawlStatus::Failed, failure_message(error)),
    };

    if !ctx.registry.is_owner(ctx.id, ctx.run) {
        tracing::debug!(
            "Crawl job {} already finished, discarding {} outcome",
            ctx.id,
            status
        );
        return;
    }

    match status {
        CrawlStatus::Completed => {
            tracing::info!(
                "Crawl job {} completed: {} internal, {} external, {} broken links",
                ctx.id,
                result.internal_links,
                result.external_links,
                result.broken_links.len()
            );
            persist_success(ctx, &result);
        }
        _ => {
            tracing::warn!("Crawl job {} failed: {}", ctx.id, message);
            if let Err(e) =
                ctx.repository
                    .update_url_status(ctx.id, UrlStatus::Error, Some(&message))
            {
                tracing::warn!("Failed to update URL status for ID {}: {}", ctx.id, e);
            }
        }
    }

    if !ctx
        .registry
        .finish(ctx.id, ctx.run, status, &message, result)
    {
        // Stopped while the outcome was being written
        tracing::debug!("Crawl job {} stopped during persistence", ctx.id);
        if let Err(e) =
            ctx.repository
                .update_url_status(ctx.id, UrlStatus::Error, Some(CANCELLED_MESSAGE))
        {
            tracing::warn!("Failed to update URL status for ID {}: {}", ctx.id, e);
        }
    }
}

fn persist_success(ctx: &JobContext, result: &CrawlJobResult) {
    let repository = ctx.repository.as_ref();
    let mut record = CrawlResultRecord::from_result(ctx.id, result);

    if let Err(e) = repository.create_crawl_result(&mut record) {
        tracing::warn!("Failed to save crawl results for URL ID {}: {}", ctx.id, e);
        let message = format!("failed to save results: {}", e);
        if let Err(e) = repository.update_url_status(ctx.id, UrlStatus::Error, Some(&message)) {
            tracing::warn!("Failed to update URL status for ID {}: {}", ctx.id, e);
        }
        return;
    }

    if !result.broken_links.is_empty() {
        let links: Vec<BrokenLinkRecord> = result
            .broken_links
            .iter()
            .map(BrokenLinkRecord::from)
            .collect();
        if let Err(e) = repository.create_broken_links(record.id, &links) {
            tracing::warn!("Failed to save broken links for URL ID {}: {}", ctx.id, e);
        }
    }

    if let Err(e) = repository.update_url_status(ctx.id, UrlStatus::Completed, None) {
        tracing::warn!("Failed to update URL status for ID {}: {}", ctx.id, e);
    }
}
