//! Storage traits and error types
//!
//! This module defines the persistence contract the job orchestrator relies
//! on, and its error type.

use crate::storage::{BrokenLinkRecord, CrawlResultRecord, UrlRecord, UrlStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("URL not found: {0}")]
    UrlNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence backend used by the crawler service
///
/// Implementations are shared between the orchestrator and every background
/// crawl task, so all methods take `&self` and must be thread-safe.
pub trait Repository: Send + Sync {
    // ===== URL Records =====

    /// Registers a new URL in the `queued` state
    fn create_url(&self, url: &str) -> StorageResult<UrlRecord>;

    /// Gets a URL record by ID
    ///
    /// Returns `StorageError::UrlNotFound` if no record exists.
    fn get_url_by_id(&self, id: i64) -> StorageResult<UrlRecord>;

    /// Gets a URL record by its address
    fn get_url_by_url(&self, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Updates the status of a URL, replacing its error message
    fn update_url_status(
        &self,
        id: i64,
        status: UrlStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    // ===== Crawl Results =====

    /// Stores a crawl result and assigns `result.id`
    fn create_crawl_result(&self, result: &mut CrawlResultRecord) -> StorageResult<()>;

    /// Gets the most recent crawl result for a URL
    fn get_crawl_result_by_url_id(&self, url_id: i64) -> StorageResult<Option<CrawlResultRecord>>;

    // ===== Broken Links =====

    /// Stores the broken links found by one crawl
    fn create_broken_links(
        &self,
        crawl_result_id: i64,
        links: &[BrokenLinkRecord],
    ) -> StorageResult<()>;

    /// Gets the broken links of the most recent crawl of a URL
    fn get_broken_links_by_url_id(&self, url_id: i64) -> StorageResult<Vec<BrokenLinkRecord>>;
}
