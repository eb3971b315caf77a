//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made by the engine:
//! - Building the shared client with timeout, redirect limit, and user agent
//! - GET requests for the target page, capturing status and headers
//! - Charset-aware body decoding
//! - Status phrases for error messages

use crate::config::CrawlOptions;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::collections::HashMap;

/// A fetched page, regardless of its status code
///
/// The body has not been read yet; see [`FetchedPage::text`].
#[derive(Debug)]
pub struct FetchedPage {
    pub status_code: u16,
    /// First value of each header, keyed by lowercase name
    pub headers: HashMap<String, String>,
    response: Response,
}

impl FetchedPage {
    /// Body size announced by the server, if known
    pub fn declared_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Reads the body and decodes it
    ///
    /// The `charset` parameter of Content-Type picks the encoding, UTF-8 is
    /// the fallback, and malformed sequences become U+FFFD. A BOM is stripped.
    pub async fn text(self) -> Result<String, reqwest::Error> {
        self.response.text().await
    }
}

/// Builds an HTTP client from the crawl options
///
/// The timeout and redirect limit apply to every request made with the
/// client, both page fetches and link checks.
///
/// # Example
///
/// ```
/// use url_analyzer::config::CrawlOptions;
/// use url_analyzer::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlOptions::default()).unwrap();
/// ```
pub fn build_http_client(options: &CrawlOptions) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(options.user_agent.clone())
        .default_headers(headers)
        .timeout(options.timeout())
        .redirect(Policy::limited(options.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page with GET
///
/// Any HTTP status is a successful fetch here; only transport failures
/// (DNS, connect, TLS, timeout, redirect limit) are errors.
pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage, reqwest::Error> {
    let response = client.get(url).send().await?;

    let status_code = response.status().as_u16();
    let headers = first_header_values(response.headers());

    tracing::debug!(
        "Fetched {} -> {} (status {})",
        url,
        response.url(),
        status_code
    );

    Ok(FetchedPage {
        status_code,
        headers,
        response,
    })
}

/// Keeps the first value seen for each header name
fn first_header_values(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .keys()
        .filter_map(|name| {
            let value = headers.get(name)?.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// Returns the standard reason phrase for a status code, or "" if unknown
pub fn status_text(status_code: u16) -> &'static str {
    StatusCode::from_u16(status_code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("")
}
