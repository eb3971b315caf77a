//! Crawler module: the single-page crawl engine
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of the target page
//! - HTML analysis (title, headings, links, login forms, version, meta tags)
//! - Link classification (internal/external) and exclusion rules
//! - Bounded-concurrency broken-link validation
//! - The `Crawler` engine tying the steps together with progress reporting

mod analyzer;
mod engine;
mod fetcher;
mod links;
mod types;
mod validator;

pub use analyzer::{analyze_html, detect_html_version, detect_login_form, extract_html_info};
pub use engine::{Crawler, ProgressCallback};
pub use fetcher::{build_http_client, fetch_page, status_text, FetchedPage};
pub use links::{classify_link, is_internal, resolve_link, should_skip_link};
pub use types::{CrawlBrokenLink, CrawlJobResult, HtmlInfo, LinkInfo};
pub use validator::{check_broken_links, check_single_link};
