//! HTML analyzer for extracting structural facts from a page
//!
//! This module handles analyzing a parsed document to extract:
//! - Page title and heading counts (h1..h6)
//! - Outbound links, classified internal/external
//! - Login-form presence
//! - A best-effort HTML version label
//! - `<meta name>` tags
//!
//! Analysis is pure: no network access and no side effects.

use crate::crawler::links::classify_link;
use crate::crawler::types::{HtmlInfo, LinkInfo};
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashMap};
use url::Url;

const SEMANTIC_TAGS: &str = "article, aside, footer, header, nav, section, main";
const PASSWORD_INPUT: &str = "input[type='password']";

/// Analyzes raw HTML text
///
/// # Example
///
/// ```
/// use url_analyzer::crawler::analyze_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let info = analyze_html(html, &base_url);
/// assert_eq!(info.title, "Test");
/// assert_eq!(info.internal_link_count(), 1);
/// ```
pub fn analyze_html(html: &str, base_url: &Url) -> HtmlInfo {
    let document = Html::parse_document(html);
    extract_html_info(&document, base_url)
}

/// Extracts every [`HtmlInfo`] field from a parsed document
pub fn extract_html_info(document: &Html, base_url: &Url) -> HtmlInfo {
    HtmlInfo {
        title: extract_title(document),
        html_version: detect_html_version(document),
        headings: count_headings(document),
        links: extract_links(document, base_url),
        has_login_form: detect_login_form(document),
        meta_tags: extract_meta_tags(document),
    }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

fn count_matches(document: &Html, css: &str) -> usize {
    selector(css).map_or(0, |s| document.select(&s).count())
}

/// Extracts the first `<title>` text, trimmed
fn extract_title(document: &Html) -> String {
    selector("title")
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .map(|element| element.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

/// Counts each heading level independently
fn count_headings(document: &Html) -> BTreeMap<String, usize> {
    (1..=6)
        .map(|level| {
            let tag = format!("h{}", level);
            let count = count_matches(document, &tag);
            (tag, count)
        })
        .collect()
}

/// Guesses the HTML version
///
/// Any HTML5 sectioning element wins. Otherwise the doctype identifiers and
/// the root element's `version`/`xmlns` attributes are searched for legacy
/// markers. Everything else is reported as HTML5; this is a heuristic, not a
/// doctype validator.
pub fn detect_html_version(document: &Html) -> String {
    if count_matches(document, SEMANTIC_TAGS) > 0 {
        return "HTML5".to_string();
    }

    let markers = legacy_markers(document).to_lowercase();

    if markers.contains("html 4") {
        return "HTML 4.01".to_string();
    }

    if markers.contains("xhtml") {
        return "XHTML 1.0".to_string();
    }

    "HTML5".to_string()
}

fn legacy_markers(document: &Html) -> String {
    let mut markers = String::new();

    for node in document.tree.root().children() {
        if let Some(doctype) = node.value().as_doctype() {
            markers.push_str(doctype.public_id());
            markers.push(' ');
            markers.push_str(doctype.system_id());
            markers.push(' ');
        }
    }

    let root = document.root_element();
    for attr in ["version", "xmlns"] {
        if let Some(value) = root.value().attr(attr) {
            markers.push_str(value);
            markers.push(' ');
        }
    }

    markers
}

/// Extracts and classifies every qualifying `<a href>` in document order
fn extract_links(document: &Html, base_url: &Url) -> Vec<LinkInfo> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let text = element.text().collect::<String>();
            classify_link(href, &text, base_url)
        })
        .collect()
}

/// Returns true if the page contains a login form
///
/// A password input anywhere on the page is the whole rule. Login-looking
/// input names or form actions are not consulted: any form they could flag
/// already holds a password input.
pub fn detect_login_form(document: &Html) -> bool {
    count_matches(document, PASSWORD_INPUT) > 0
}

/// Maps `name` to `content` for every `<meta>` carrying both
fn extract_meta_tags(document: &Html) -> HashMap<String, String> {
    let Some(meta) = selector("meta[name][content]") else {
        return HashMap::new();
    };

    document
        .select(&meta)
        .filter_map(|element| {
            let name = element.value().attr("name")?;
            let content = element.value().attr("content")?;
            Some((name.to_string(), content.to_string()))
        })
        .collect()
}
