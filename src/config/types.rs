use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default user agent presented to crawled sites
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; URL-Analyzer/1.0; +https://github.com/url-analyzer)";

/// Main configuration structure for the analyzer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlOptions,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Crawl engine options
///
/// Supplied once when a [`crate::crawler::Crawler`] is built and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlOptions {
    /// Per-request timeout for page fetches and link checks (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whether outbound links are checked after analysis
    #[serde(rename = "check-broken-links")]
    pub check_broken_links: bool,

    /// Only the first N links of a page are checked
    #[serde(rename = "max-links-to-check")]
    pub max_links_to_check: usize,

    /// Size of the link-check admission gate
    #[serde(rename = "concurrent-checks")]
    pub concurrent_checks: usize,

    /// Sleep `rate_limit_delay_ms` before each check
    #[serde(rename = "respect-rate-limit")]
    pub respect_rate_limit: bool,

    /// Delay before each link check (milliseconds)
    #[serde(rename = "rate-limit-delay-ms")]
    pub rate_limit_delay_ms: u64,

    /// Reported in stats only; robots.txt is never fetched or enforced
    #[serde(rename = "respect-robots-txt")]
    pub respect_robots_txt: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_redirects: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            check_broken_links: true,
            max_links_to_check: 100,
            concurrent_checks: 5,
            respect_rate_limit: true,
            rate_limit_delay_ms: 1000,
            respect_robots_txt: false,
        }
    }
}

impl CrawlOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "url-analyzer.db".to_string()
}
