//! Storage module for persisting URLs and crawl outcomes
//!
//! This module handles all database operations around crawl jobs, including:
//! - SQLite database initialization and schema management
//! - URL records and their queued/running/completed/error status
//! - Crawl result and broken-link persistence

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRepository;
pub use traits::{Repository, StorageError, StorageResult};

use crate::crawler::{CrawlBrokenLink, CrawlJobResult};
use chrono::Utc;

/// A URL registered for crawling
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub status: UrlStatus,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Persisted summary of one successful crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResultRecord {
    pub id: i64,
    pub url_id: i64,
    pub title: Option<String>,
    pub html_version: Option<String>,
    pub h1_count: u32,
    pub h2_count: u32,
    pub h3_count: u32,
    pub h4_count: u32,
    pub h5_count: u32,
    pub h6_count: u32,
    pub internal_links: u32,
    pub external_links: u32,
    pub broken_links_count: u32,
    pub has_login_form: bool,
    pub crawled_at: String,
}

impl CrawlResultRecord {
    /// Builds an unsaved record (id 0) from an engine result
    pub fn from_result(url_id: i64, result: &CrawlJobResult) -> Self {
        let heading = |tag: &str| to_u32(result.heading_count(tag));

        Self {
            id: 0,
            url_id,
            title: non_empty(&result.title),
            html_version: non_empty(&result.html_version),
            h1_count: heading("h1"),
            h2_count: heading("h2"),
            h3_count: heading("h3"),
            h4_count: heading("h4"),
            h5_count: heading("h5"),
            h6_count: heading("h6"),
            internal_links: to_u32(result.internal_links),
            external_links: to_u32(result.external_links),
            broken_links_count: to_u32(result.broken_links.len()),
            has_login_form: result.has_login_form,
            crawled_at: Utc::now().to_rfc3339(),
        }
    }
}

/// A broken link row tied to a crawl result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLinkRecord {
    pub id: i64,
    pub crawl_result_id: i64,
    pub url: String,
    pub status_code: u16,
    pub error_message: String,
}

impl From<&CrawlBrokenLink> for BrokenLinkRecord {
    fn from(link: &CrawlBrokenLink) -> Self {
        Self {
            id: 0,
            crawl_result_id: 0,
            url: link.url.clone(),
            status_code: link.status_code,
            error_message: link.error_message.clone(),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Status of a persisted URL record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl UrlStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}
