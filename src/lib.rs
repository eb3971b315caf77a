//! URL Analyzer: single-page crawl engine and job orchestrator
//!
//! This crate fetches one web page, extracts structural and SEO-relevant facts
//! (title, headings, links, login forms, HTML version), validates every
//! outbound link on that page, and runs each crawl as a tracked background job
//! with live progress and cancellation.

pub mod config;
pub mod crawler;
pub mod jobs;
pub mod output;
pub mod state;
pub mod storage;

use serde::Serialize;
use thiserror::Error;

/// Terminal outcome of a failed crawl
///
/// Engine errors never cross the engine boundary as `Err`; they are carried
/// inside [`crawler::CrawlJobResult::error`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CrawlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to fetch URL: {0}")]
    FetchFailed(String),

    #[error("HTTP error: {status} {reason}")]
    Http { status: u16, reason: String },

    #[error("failed to parse HTML: {0}")]
    ParseFailed(String),

    #[error("crawl cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors returned synchronously by the job orchestrator
#[derive(Debug, Error)]
pub enum JobError {
    #[error("crawl already in progress for URL {0}")]
    AlreadyInProgress(i64),

    #[error("no active crawl job for URL {0}")]
    NoActiveJob(i64),

    #[error("crawl job for URL {0} has already finished")]
    AlreadyFinished(i64),

    #[error("URL {0} not found")]
    NotFound(i64),

    #[error("failed to get URL {id}: {source}")]
    LookupFailed {
        id: i64,
        source: storage::StorageError,
    },

    #[error("persistence error: {0}")]
    Persistence(#[from] storage::StorageError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, JobError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, CrawlOptions};
pub use crawler::{CrawlJobResult, Crawler};
pub use jobs::{CrawlerService, CrawlerStats};
pub use state::{CrawlJob, CrawlStatus};
pub use storage::{Repository, SqliteRepository};
