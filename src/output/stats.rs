//! Crawler statistics display

use crate::jobs::CrawlerStats;

/// Prints crawler statistics to stdout in a formatted manner
pub fn print_crawler_stats(stats: &CrawlerStats) {
    println!("=== Crawler Statistics ===\n");

    println!("Configuration:");
    println!("  Timeout: {}s", stats.timeout);
    println!("  Max redirects: {}", stats.max_redirects);
    println!("  User agent: {}", stats.user_agent);
    println!("  Check broken links: {}", stats.check_broken_links);
    println!("  Max links to check: {}", stats.max_links_to_check);
    println!("  Concurrent checks: {}", stats.concurrent_checks);
    println!();

    println!("Jobs:");
    println!("  Active: {}", stats.active_jobs);
    println!("  Total: {}", stats.total_jobs);

    for (status, count) in &stats.job_status_counts {
        let percentage = if stats.total_jobs > 0 {
            (*count as f64 / stats.total_jobs as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
}
