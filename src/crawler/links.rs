//! Link filtering, resolution, and internal/external classification
//!
//! Excluded hrefs:
//! - `javascript:`, `mailto:`, `tel:`, `ftp:` schemes
//! - Pure fragments (`#section`)
//! - Anything that does not resolve to an http/https URL

use crate::crawler::types::LinkInfo;
use url::Url;

const SKIP_PREFIXES: [&str; 5] = ["javascript:", "mailto:", "tel:", "ftp:", "#"];

/// Returns true if the href must never be counted or checked
///
/// The check is case-insensitive and ignores surrounding whitespace.
pub fn should_skip_link(href: &str) -> bool {
    let href = href.trim().to_ascii_lowercase();
    SKIP_PREFIXES.iter().any(|prefix| href.starts_with(prefix))
}

/// Resolves an href against the page address
///
/// Returns None if the link should be excluded.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    if should_skip_link(href) {
        return None;
    }

    let resolved = base_url.join(href.trim()).ok()?;

    // Only accept HTTP and HTTPS URLs
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Returns true if `link` lives on the same host as `base_url`
///
/// Hosts compare together with any explicit port, so `localhost:8080` and
/// `localhost:9090` are different sites.
pub fn is_internal(link: &Url, base_url: &Url) -> bool {
    match link.host_str() {
        None | Some("") => true,
        Some(host) => {
            base_url
                .host_str()
                .is_some_and(|base| base.eq_ignore_ascii_case(host))
                && link.port() == base_url.port()
        }
    }
}

/// Builds a classified [`LinkInfo`] for one anchor, or None if excluded
pub fn classify_link(href: &str, text: &str, base_url: &Url) -> Option<LinkInfo> {
    let resolved = resolve_link(href, base_url)?;
    let internal = is_internal(&resolved, base_url);

    Some(LinkInfo {
        url: resolved.to_string(),
        text: text.trim().to_string(),
        is_internal: internal,
        is_external: !internal,
    })
}
