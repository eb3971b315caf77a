//! Broken-link validator
//!
//! Checks the outbound links of a page with bounded concurrency:
//! - Only the first `max_links_to_check` links are considered
//! - One worker task per link; each holds a slot of the admission gate
//!   (a semaphore sized `concurrent_checks`) for its delay and request
//! - HEAD first, a single GET retry if HEAD fails at the transport level
//! - Status >= 400 or a failed request marks the link broken

use crate::config::CrawlOptions;
use crate::crawler::fetcher::status_text;
use crate::crawler::links::should_skip_link;
use crate::crawler::types::{CrawlBrokenLink, LinkInfo};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Returns the subset of `links` that are broken
///
/// All workers are joined before returning. Findings come back in the order
/// the links appear on the page. If `cancel` fires, workers that have not yet
/// checked give up and the links checked so far are returned.
pub async fn check_broken_links(
    client: &Client,
    links: &[LinkInfo],
    options: &CrawlOptions,
    cancel: &CancellationToken,
) -> Vec<CrawlBrokenLink> {
    let gate = Arc::new(Semaphore::new(options.concurrent_checks.max(1)));
    let findings: Arc<Mutex<Vec<(usize, CrawlBrokenLink)>>> = Arc::new(Mutex::new(Vec::new()));
    let delay = options
        .respect_rate_limit
        .then(|| options.rate_limit_delay());

    let mut workers = JoinSet::new();

    for (index, link) in links.iter().take(options.max_links_to_check).enumerate() {
        if should_skip_link(&link.url) {
            continue;
        }

        let client = client.clone();
        let gate = Arc::clone(&gate);
        let findings = Arc::clone(&findings);
        let cancel = cancel.clone();
        let link = link.clone();

        workers.spawn(async move {
            let Ok(_permit) = gate.acquire_owned().await else {
                return;
            };

            if let Some(broken) = check_with_gate(&client, &link, delay, &cancel).await {
                findings.lock().await.push((index, broken));
            }
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::warn!("Link check worker failed: {}", e);
        }
    }

    let mut findings = std::mem::take(&mut *findings.lock().await);
    findings.sort_by_key(|(index, _)| *index);
    findings.into_iter().map(|(_, broken)| broken).collect()
}

/// Runs the optional rate-limit delay and the check, both cancellable
async fn check_with_gate(
    client: &Client,
    link: &LinkInfo,
    delay: Option<Duration>,
    cancel: &CancellationToken,
) -> Option<CrawlBrokenLink> {
    if let Some(delay) = delay {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        broken = check_single_link(client, link) => broken,
    }
}

/// Checks a single link, returning a finding if it is broken
pub async fn check_single_link(client: &Client, link: &LinkInfo) -> Option<CrawlBrokenLink> {
    // HEAD first; it skips the body download
    let response = match client.head(&link.url).send().await {
        Ok(response) => response,
        Err(head_error) => {
            tracing::trace!("HEAD {} failed ({}), retrying with GET", link.url, head_error);
            match client.get(&link.url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("Link {} unreachable: {}", link.url, e);
                    return Some(broken_link(link, 0, e.to_string()));
                }
            }
        }
    };

    let status_code = response.status().as_u16();
    if status_code >= 400 {
        tracing::debug!("Link {} returned {}", link.url, status_code);
        return Some(broken_link(link, status_code, status_text(status_code).to_string()));
    }

    tracing::trace!("Link {} ok ({})", link.url, status_code);
    None
}

fn broken_link(link: &LinkInfo, status_code: u16, error_message: String) -> CrawlBrokenLink {
    CrawlBrokenLink {
        url: link.url.clone(),
        status_code,
        error_message,
        link_text: link.text.clone(),
        is_internal: link.is_internal,
    }
}
