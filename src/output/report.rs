//! Crawl job reports

use crate::state::CrawlJob;

/// Prints one job and its result to stdout
pub fn print_job_report(job: &CrawlJob) {
    println!("=== {} ===\n", job.url);
    println!("  Status: {} ({:.0}%)", job.status, job.progress);
    println!("  Message: {}", job.message);
    println!(
        "  Elapsed: {:.2}s",
        job.elapsed().num_milliseconds() as f64 / 1000.0
    );

    let Some(result) = &job.result else {
        println!();
        return;
    };

    if let Some(error) = &result.error {
        println!("  Error: {}", error);
        if result.status_code > 0 {
            println!("  HTTP status: {}", result.status_code);
        }
        println!();
        return;
    }

    println!();
    println!("Page:");
    println!("  HTTP status: {}", result.status_code);
    println!("  Content length: {} bytes", result.content_length);
    println!("  Title: {}", display_or_dash(&result.title));
    println!("  HTML version: {}", display_or_dash(&result.html_version));
    println!(
        "  Login form: {}",
        if result.has_login_form { "yes" } else { "no" }
    );
    println!();

    println!("Headings:");
    for level in 1..=6 {
        let tag = format!("h{}", level);
        println!("  {}: {}", tag, result.heading_count(&tag));
    }
    println!();

    println!("Links:");
    println!("  Internal: {}", result.internal_links);
    println!("  External: {}", result.external_links);
    println!("  Broken: {}", result.broken_links.len());

    for link in &result.broken_links {
        let kind = if link.is_internal { "internal" } else { "external" };
        if link.status_code > 0 {
            println!(
                "    - [{}] {} ({} {})",
                kind, link.url, link.status_code, link.error_message
            );
        } else {
            println!("    - [{}] {} ({})", kind, link.url, link.error_message);
        }
    }
    println!();
}

/// Serializes a job snapshot as pretty JSON
pub fn render_job_json(job: &CrawlJob) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(job)
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
