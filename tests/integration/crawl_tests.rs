//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch, analyze, and link-check cycle end-to-end. A second mock server on a
//! different port plays the role of an external site.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url_analyzer::config::CrawlOptions;
use url_analyzer::crawler::Crawler;
use url_analyzer::{CrawlError, CrawlStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Options with fast timeouts and no rate-limit delay
fn test_options() -> CrawlOptions {
    CrawlOptions {
        timeout_secs: 5,
        respect_rate_limit: false,
        rate_limit_delay_ms: 0,
        ..CrawlOptions::default()
    }
}

fn html_response(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.into())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_head(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Address of a local port with nothing listening on it
fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

const EMPTY_OK: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Plain TCP server answering each request with an empty 200 after `hold`
///
/// Returns its base URL and the highest number of requests it ever had in
/// flight at once.
async fn spawn_counting_server(hold: Duration) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let peak_seen = Arc::clone(&peak);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                if socket.read(&mut buf).await.unwrap_or(0) == 0 {
                    return;
                }
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(hold).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                let _ = socket.write_all(EMPTY_OK).await;
            });
        }
    });

    (base, peak_seen)
}

/// Plain TCP server that hangs up on HEAD requests and answers GET with 200
async fn spawn_head_dropping_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let read = socket.read(&mut buf).await.unwrap_or(0);
                if buf[..read].starts_with(b"GET ") {
                    let _ = socket.write_all(EMPTY_OK).await;
                }
                // Anything else is dropped without a response
            });
        }
    });

    base
}

async fn mount_links_page(site: &MockServer, hrefs: &[String]) {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(format!("<html><body>{}</body></html>", anchors)))
        .mount(site)
        .await;
}

fn record_progress(crawler: &Crawler) -> Arc<Mutex<Vec<(CrawlStatus, f64)>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    crawler.set_progress_callback(Arc::new(
        move |status: CrawlStatus, _message: &str, progress: f64| {
            sink.lock().unwrap().push((status, progress));
        },
    ));
    events
}

#[tokio::test]
async fn test_full_crawl_with_broken_internal_link() {
    let site = MockServer::start().await;
    let external = MockServer::start().await;
    let base_url = site.uri();
    let external_url = external.uri();

    let page = format!(
        r##"<!DOCTYPE html>
        <html><head><title>  Example Home </title>
        <meta name="description" content="A test page"></head>
        <body>
            <header><h1>Welcome</h1></header>
            <h2>One</h2><h2>Two</h2>
            <a href="/about">About</a>
            <a href="{base}/contact">Contact</a>
            <a href="/broken">Broken</a>
            <a href="{ext}/partner">Partner</a>
            <a href="{ext}/news">News</a>
            <a href="javascript:void(0)">Script</a>
            <a href="mailto:team@example.com">Mail</a>
            <a href="#top">Top</a>
            <form action="/login" method="post">
                <input type="text" name="username">
                <input type="password" name="password">
            </form>
        </body></html>"##,
        base = base_url,
        ext = external_url
    );

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(page))
        .mount(&site)
        .await;
    mount_head(&site, "/about", 200).await;
    mount_head(&site, "/contact", 200).await;
    mount_head(&site, "/broken", 404).await;
    mount_head(&external, "/partner", 200).await;
    mount_head(&external, "/news", 200).await;

    let crawler = Crawler::new(test_options()).unwrap();
    let events = record_progress(&crawler);

    let result = crawler.crawl_url(&format!("{}/", base_url)).await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert!(result.is_success());
    assert_eq!(result.status_code, 200);
    assert!(result.content_length > 0);
    assert_eq!(result.title, "Example Home");
    assert_eq!(result.html_version, "HTML5");
    assert_eq!(result.heading_count("h1"), 1);
    assert_eq!(result.heading_count("h2"), 2);
    assert_eq!(result.heading_count("h3"), 0);
    assert_eq!(result.internal_links, 3);
    assert_eq!(result.external_links, 2);
    assert!(result.has_login_form);
    assert_eq!(
        result.meta_tags.get("description").map(String::as_str),
        Some("A test page")
    );

    assert_eq!(result.broken_links.len(), 1);
    let broken = &result.broken_links[0];
    assert_eq!(broken.url, format!("{}/broken", base_url));
    assert_eq!(broken.status_code, 404);
    assert_eq!(broken.error_message, "Not Found");
    assert_eq!(broken.link_text, "Broken");
    assert!(broken.is_internal);

    let events = events.lock().unwrap();
    assert_eq!(events.first(), Some(&(CrawlStatus::Started, 0.0)));
    assert_eq!(events.last(), Some(&(CrawlStatus::Completed, 100.0)));
    assert!(events.contains(&(CrawlStatus::Checking, 70.0)));
    assert!(
        events.windows(2).all(|w| w[0].1 <= w[1].1),
        "progress went backwards: {:?}",
        *events
    );
}

#[tokio::test]
async fn test_http_error_page_fails_crawl() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&site)
        .await;

    let crawler = Crawler::new(test_options()).unwrap();
    let events = record_progress(&crawler);

    let result = crawler.crawl_url(&format!("{}/missing", site.uri())).await;

    assert_eq!(result.status_code, 404);
    assert_eq!(
        result.error,
        Some(CrawlError::Http {
            status: 404,
            reason: "Not Found".to_string()
        })
    );
    assert!(result
        .error
        .as_ref()
        .unwrap()
        .to_string()
        .starts_with("HTTP error: 404"));
    assert!(result.title.is_empty());
    assert_eq!(
        events.lock().unwrap().last(),
        Some(&(CrawlStatus::Failed, 100.0))
    );
}

#[tokio::test]
async fn test_unreachable_host_is_fetch_failure() {
    let address = closed_address();

    let crawler = Crawler::new(test_options()).unwrap();
    let result = crawler.crawl_url(&format!("{}/", address)).await;

    assert!(matches!(result.error, Some(CrawlError::FetchFailed(_))));
    assert_eq!(result.status_code, 0);
}

#[tokio::test]
async fn test_latin1_page_is_decoded_by_charset() {
    let site = MockServer::start().await;
    let body = b"<html><head><title>Caf\xE9 M\xFCnchen</title></head>\
        <body><h1>Men\xFC</h1><a href=\"/karte\">Karte</a></body></html>"
        .to_vec();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=iso-8859-1"))
        .mount(&site)
        .await;
    mount_head(&site, "/karte", 200).await;

    let crawler = Crawler::new(test_options()).unwrap();
    let result = crawler.crawl_url(&format!("{}/", site.uri())).await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(result.title, "Caf\u{e9} M\u{fc}nchen");
    assert_eq!(result.heading_count("h1"), 1);
    assert_eq!(result.internal_links, 1);
    assert!(result.broken_links.is_empty());
}

#[tokio::test]
async fn test_malformed_utf8_is_replaced_not_rejected() {
    let site = MockServer::start().await;
    let mut body = b"<html><head><title>Broken ".to_vec();
    body.extend_from_slice(&[0xff, 0xfe]);
    body.extend_from_slice(b"</title></head><body></body></html>");
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(&site)
        .await;

    let crawler = Crawler::new(test_options()).unwrap();
    let result = crawler.crawl_url(&format!("{}/", site.uri())).await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert!(result.title.starts_with("Broken "));
    assert!(result.title.contains('\u{fffd}'));
}

#[tokio::test]
async fn test_head_method_not_allowed_is_broken() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(r#"<html><body><a href="/api">API</a></body></html>"#))
        .mount(&site)
        .await;
    mount_head(&site, "/api", 405).await;

    let crawler = Crawler::new(test_options()).unwrap();
    let result = crawler.crawl_url(&format!("{}/", site.uri())).await;

    assert!(result.error.is_none());
    assert_eq!(result.broken_links.len(), 1);
    assert_eq!(result.broken_links[0].status_code, 405);
    assert_eq!(result.broken_links[0].error_message, "Method Not Allowed");
}

#[tokio::test]
async fn test_unreachable_link_recorded_with_status_zero() {
    let site = MockServer::start().await;
    let dead_url = closed_address();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(format!(
            r#"<html><body><a href="{}/gone">Gone</a></body></html>"#,
            dead_url
        )))
        .mount(&site)
        .await;

    let crawler = Crawler::new(test_options()).unwrap();
    let result = crawler.crawl_url(&format!("{}/", site.uri())).await;

    assert!(result.error.is_none());
    assert_eq!(result.external_links, 1);
    assert_eq!(result.broken_links.len(), 1);
    assert_eq!(result.broken_links[0].status_code, 0);
    assert!(!result.broken_links[0].error_message.is_empty());
    assert!(!result.broken_links[0].is_internal);
}

#[tokio::test]
async fn test_only_first_links_are_checked() {
    let site = MockServer::start().await;
    let anchors: String = (0..6)
        .map(|i| format!(r#"<a href="/missing-{}">Missing {}</a>"#, i, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(format!("<html><body>{}</body></html>", anchors)))
        .mount(&site)
        .await;

    let options = CrawlOptions {
        max_links_to_check: 4,
        concurrent_checks: 2,
        ..test_options()
    };
    let crawler = Crawler::new(options).unwrap();
    let result = crawler.crawl_url(&format!("{}/", site.uri())).await;

    assert_eq!(result.internal_links, 6);
    let checked: Vec<&str> = result.broken_links.iter().map(|b| b.url.as_str()).collect();
    assert_eq!(checked.len(), 4);
    for (i, url) in checked.iter().enumerate() {
        assert!(url.ends_with(&format!("/missing-{}", i)), "unexpected order: {:?}", checked);
    }
}

#[tokio::test]
async fn test_link_checking_can_be_disabled() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(r#"<html><body><a href="/nowhere">x</a></body></html>"#))
        .mount(&site)
        .await;

    let options = CrawlOptions {
        check_broken_links: false,
        ..test_options()
    };
    let crawler = Crawler::new(options).unwrap();
    let events = record_progress(&crawler);
    let result = crawler.crawl_url(&format!("{}/", site.uri())).await;

    assert!(result.error.is_none());
    assert_eq!(result.internal_links, 1);
    assert!(result.broken_links.is_empty());
    assert!(!events
        .lock()
        .unwrap()
        .iter()
        .any(|(status, _)| *status == CrawlStatus::Checking));
}

#[tokio::test]
async fn test_cancel_during_slow_fetch() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response("<html></html>").set_delay(Duration::from_secs(3)))
        .mount(&site)
        .await;

    let crawler = Crawler::new(test_options()).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = crawler
        .crawl_url_with_cancel(&format!("{}/", site.uri()), &cancel)
        .await;

    assert_eq!(result.error, Some(CrawlError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_admission_gate_bounds_concurrent_checks() {
    let site = MockServer::start().await;
    let (links_base, peak) = spawn_counting_server(Duration::from_millis(150)).await;
    let hrefs: Vec<String> = (0..6).map(|i| format!("{}/page-{}", links_base, i)).collect();
    mount_links_page(&site, &hrefs).await;

    let options = CrawlOptions {
        concurrent_checks: 2,
        ..test_options()
    };
    let crawler = Crawler::new(options).unwrap();
    let result = crawler.crawl_url(&format!("{}/", site.uri())).await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(result.external_links, 6);
    assert!(result.broken_links.is_empty());
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limit_delays_each_check() {
    let site = MockServer::start().await;
    let base = site.uri();
    mount_links_page(&site, &[format!("{}/one", base), format!("{}/two", base)]).await;
    mount_head(&site, "/one", 200).await;
    mount_head(&site, "/two", 200).await;

    let delay = Duration::from_millis(300);
    let options = CrawlOptions {
        concurrent_checks: 1,
        respect_rate_limit: true,
        rate_limit_delay_ms: delay.as_millis() as u64,
        ..test_options()
    };
    let crawler = Crawler::new(options).unwrap();

    let started = Instant::now();
    let result = crawler.crawl_url(&format!("{}/", base)).await;
    let elapsed = started.elapsed();

    assert!(result.error.is_none());
    assert!(result.broken_links.is_empty());
    // The delay is taken inside the single gate slot, once per link
    assert!(elapsed >= delay * 2, "crawl took only {:?}", elapsed);
}

#[tokio::test]
async fn test_head_transport_failure_falls_back_to_get() {
    let site = MockServer::start().await;
    let links_base = spawn_head_dropping_server().await;
    mount_links_page(&site, &[format!("{}/resource", links_base)]).await;

    let crawler = Crawler::new(test_options()).unwrap();
    let result = crawler.crawl_url(&format!("{}/", site.uri())).await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(result.external_links, 1);
    assert!(
        result.broken_links.is_empty(),
        "link reported broken: {:?}",
        result.broken_links
    );
}
