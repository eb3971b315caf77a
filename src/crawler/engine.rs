//! Crawl engine: fetch, parse, analyze, and validate one page
//!
//! Progress is reported through an optional callback as the pipeline moves
//! through its steps:
//!
//! | Step | Status | Progress |
//! |------|--------|----------|
//! | start | Started | 0 |
//! | GET target | Fetching | 10 |
//! | decode body | Parsing | 30 |
//! | extract facts | Analyzing | 50 |
//! | check links | Checking | 70 |
//! | done | Completed | 100 |
//!
//! Any failure reports `Failed` at 100 and ends the crawl.

use crate::config::CrawlOptions;
use crate::crawler::analyzer::extract_html_info;
use crate::crawler::fetcher::{build_http_client, fetch_page, status_text, FetchedPage};
use crate::crawler::types::CrawlJobResult;
use crate::crawler::validator::check_broken_links;
use crate::state::CrawlStatus;
use crate::CrawlError;
use reqwest::Client;
use scraper::Html;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Receives `(status, message, progress)` updates from the engine
pub type ProgressCallback = Arc<dyn Fn(CrawlStatus, &str, f64) + Send + Sync>;

/// Single-page crawl engine
///
/// Reusable across crawls. The progress callback is shared by every crawl
/// run on this instance, so a caller that needs per-crawl progress should
/// own one `Crawler` per crawl (the client can be shared via
/// [`Crawler::with_client`]).
pub struct Crawler {
    client: Client,
    options: CrawlOptions,
    progress: RwLock<Option<ProgressCallback>>,
}

impl Crawler {
    /// Creates a crawler with its own HTTP client
    pub fn new(options: CrawlOptions) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&options)?;
        Ok(Self::with_client(client, options))
    }

    /// Creates a crawler that reuses an existing client
    pub fn with_client(client: Client, options: CrawlOptions) -> Self {
        Self {
            client,
            options,
            progress: RwLock::new(None),
        }
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Sets the progress callback, replacing any previous one
    pub fn set_progress_callback(&self, callback: ProgressCallback) {
        *self.progress.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn report_progress(&self, status: CrawlStatus, message: &str, progress: f64) {
        let callback = self
            .progress
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(callback) = callback {
            callback(status, message, progress);
        }
    }

    /// Crawls a single URL
    ///
    /// Always returns a result; failures are carried in
    /// [`CrawlJobResult::error`].
    pub async fn crawl_url(&self, target_url: &str) -> CrawlJobResult {
        self.crawl_url_with_cancel(target_url, &CancellationToken::new())
            .await
    }

    /// Crawls a single URL, stopping early once `cancel` fires
    ///
    /// Cancellation is observed while fetching, while reading the body, between
    /// steps, and inside every link check. A cancelled crawl ends with
    /// [`CrawlError::Cancelled`].
    pub async fn crawl_url_with_cancel(
        &self,
        target_url: &str,
        cancel: &CancellationToken,
    ) -> CrawlJobResult {
        let start_time = Instant::now();
        let mut result = CrawlJobResult::new(target_url);

        let outcome = self.run_pipeline(target_url, cancel, &mut result).await;
        result.crawl_duration = start_time.elapsed();

        match outcome {
            Ok(()) => {
                self.report_progress(CrawlStatus::Completed, "Crawl completed", 100.0);
            }
            Err((error, message)) => {
                tracing::debug!("Crawl of {} failed: {}", target_url, error);
                result.error = Some(error);
                self.report_progress(CrawlStatus::Failed, &message, 100.0);
            }
        }

        result
    }

    async fn run_pipeline(
        &self,
        target_url: &str,
        cancel: &CancellationToken,
        result: &mut CrawlJobResult,
    ) -> Result<(), (CrawlError, String)> {
        self.report_progress(CrawlStatus::Started, "Starting crawl", 0.0);

        let base_url = parse_target(target_url)
            .map_err(|e| (CrawlError::InvalidUrl(e), "Invalid URL".to_string()))?;

        self.report_progress(CrawlStatus::Fetching, "Fetching webpage", 10.0);
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            fetched = fetch_page(&self.client, base_url.as_str()) => fetched,
        };
        let page = fetched.map_err(|e| {
            (
                CrawlError::FetchFailed(e.to_string()),
                "Failed to fetch webpage".to_string(),
            )
        })?;

        record_response(result, &page);

        if page.status_code >= 400 {
            return Err((
                CrawlError::Http {
                    status: page.status_code,
                    reason: status_text(page.status_code).to_string(),
                },
                format!("HTTP {} error", page.status_code),
            ));
        }

        check_cancelled(cancel)?;
        self.report_progress(CrawlStatus::Parsing, "Parsing HTML", 30.0);
        let declared_length = page.declared_length();
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            body = page.text() => body,
        };
        let body = body.map_err(|e| {
            (
                CrawlError::ParseFailed(format!("failed to read body: {}", e)),
                "Failed to parse HTML".to_string(),
            )
        })?;
        result.content_length = declared_length.unwrap_or(body.len() as u64);

        // The document tree is not Send; keep it out of any await below
        let info = {
            let document = parse_document(&body);

            check_cancelled(cancel)?;
            self.report_progress(CrawlStatus::Analyzing, "Analyzing content", 50.0);
            extract_html_info(&document, &base_url)
        };
        result.apply_html_info(&info);

        if self.options.check_broken_links {
            check_cancelled(cancel)?;
            self.report_progress(CrawlStatus::Checking, "Checking links", 70.0);
            result.broken_links =
                check_broken_links(&self.client, &info.links, &self.options, cancel).await;
        }

        check_cancelled(cancel)?;
        Ok(())
    }
}

fn cancelled() -> (CrawlError, String) {
    (CrawlError::Cancelled, "Crawl cancelled".to_string())
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), (CrawlError, String)> {
    if cancel.is_cancelled() {
        Err(cancelled())
    } else {
        Ok(())
    }
}

/// Parses the crawl target, accepting only absolute http/https URLs
fn parse_target(target_url: &str) -> Result<Url, String> {
    let url = Url::parse(target_url.trim()).map_err(|e| e.to_string())?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

/// Stores status, announced size, and headers of the primary response
fn record_response(result: &mut CrawlJobResult, page: &FetchedPage) {
    result.status_code = page.status_code;
    result.content_length = page.declared_length().unwrap_or(0);
    result.response_headers = page.headers.clone();
}

/// Builds the document tree; html5ever recovers from any malformed markup
fn parse_document(body: &str) -> Html {
    Html::parse_document(body.trim_start_matches('\u{feff}'))
}
