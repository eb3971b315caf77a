//! Values produced by the crawl engine

use crate::CrawlError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// An outbound `<a href>` found on the crawled page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    /// Absolute URL after resolution against the page address
    pub url: String,
    /// Trimmed anchor text
    pub text: String,
    pub is_internal: bool,
    pub is_external: bool,
}

/// Structural facts extracted from one HTML document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HtmlInfo {
    pub title: String,
    pub html_version: String,
    /// Count per heading tag, keyed `h1`..`h6`
    pub headings: BTreeMap<String, usize>,
    /// Links in document order
    pub links: Vec<LinkInfo>,
    pub has_login_form: bool,
    /// `<meta name=.. content=..>` pairs
    pub meta_tags: HashMap<String, String>,
}

impl HtmlInfo {
    pub fn internal_link_count(&self) -> usize {
        self.links.iter().filter(|link| link.is_internal).count()
    }

    pub fn external_link_count(&self) -> usize {
        self.links.iter().filter(|link| link.is_external).count()
    }
}

/// A link that failed its check or answered with status >= 400
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlBrokenLink {
    pub url: String,
    /// HTTP status, or 0 when the request itself could not connect
    pub status_code: u16,
    pub error_message: String,
    pub link_text: String,
    pub is_internal: bool,
}

/// Full engine output for one page
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlJobResult {
    pub url: String,
    pub title: String,
    pub html_version: String,
    pub heading_counts: BTreeMap<String, usize>,
    pub internal_links: usize,
    pub external_links: usize,
    pub broken_links: Vec<CrawlBrokenLink>,
    pub has_login_form: bool,
    pub meta_tags: HashMap<String, String>,
    /// Status of the primary fetch, 0 if the fetch never got a response
    pub status_code: u16,
    /// Body size announced by the server, or the decoded body length when
    /// none was announced
    pub content_length: u64,
    /// First value of each response header
    pub response_headers: HashMap<String, String>,
    pub crawl_duration: Duration,
    /// `None` on success
    pub error: Option<CrawlError>,
}

impl CrawlJobResult {
    /// Creates an empty result for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Creates an empty result that carries only a terminal error
    pub fn failed(url: impl Into<String>, error: CrawlError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Copies the analyzer output into the flattened result fields
    pub fn apply_html_info(&mut self, info: &HtmlInfo) {
        self.title = info.title.clone();
        self.html_version = info.html_version.clone();
        self.heading_counts = info.headings.clone();
        self.has_login_form = info.has_login_form;
        self.meta_tags = info.meta_tags.clone();
        self.internal_links = info.internal_link_count();
        self.external_links = info.external_link_count();
    }

    pub fn heading_count(&self, tag: &str) -> usize {
        self.heading_counts.get(tag).copied().unwrap_or(0)
    }
}
