//! URL Analyzer main entry point
//!
//! This is the command-line interface for the single-page URL analyzer.

use anyhow::Context;
use clap::Parser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url_analyzer::config::load_config_or_default;
use url_analyzer::output::{print_crawler_stats, print_job_report, render_job_json};
use url_analyzer::storage::{Repository, SqliteRepository};
use url_analyzer::{CrawlStatus, CrawlerService};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// URL Analyzer: crawl a page, analyze its structure, and find broken links
///
/// Each URL is fetched once; its title, HTML version, headings, and login
/// forms are extracted and every outbound link on the page is checked.
#[derive(Parser, Debug)]
#[command(name = "url-analyzer")]
#[command(version = "1.0.0")]
#[command(about = "Single-page crawler and broken-link checker", long_about = None)]
struct Cli {
    /// URLs to analyze
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database path (overrides the config file)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Skip probing outbound links
    #[arg(long)]
    no_broken_links: bool,

    /// Print job snapshots and stats as JSON
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config =
        load_config_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.storage.database_path = db.display().to_string();
    }
    if cli.no_broken_links {
        config.crawler.check_broken_links = false;
    }

    tracing::info!("Database: {}", config.storage.database_path);
    let repository = Arc::new(
        SqliteRepository::open(Path::new(&config.storage.database_path))
            .context("Failed to open database")?,
    );
    let service = CrawlerService::new(repository.clone(), config.crawler.clone())
        .context("Failed to build HTTP client")?;

    let mut job_ids = Vec::new();
    for url in &cli.urls {
        let id = register_url(repository.as_ref(), url)?;
        match service.start_crawl(id) {
            Ok(()) => job_ids.push(id),
            Err(e) => tracing::error!("Failed to start crawl of {}: {}", url, e),
        }
    }

    wait_for_jobs(&service, &job_ids).await;

    for id in &job_ids {
        let job = match service.get_job_status(*id) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!("{}", e);
                continue;
            }
        };
        if cli.json {
            println!("{}", render_job_json(&job)?);
        } else {
            print_job_report(&job);
        }
    }

    let stats = service.get_crawler_stats();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_crawler_stats(&stats);
    }

    service.cleanup_completed_jobs();
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("url_analyzer=info,warn"),
            1 => EnvFilter::new("url_analyzer=debug,info"),
            2 => EnvFilter::new("url_analyzer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Returns the id of the stored record for `url`, creating it if needed
fn register_url(repository: &dyn Repository, url: &str) -> anyhow::Result<i64> {
    if let Some(record) = repository
        .get_url_by_url(url)
        .with_context(|| format!("Failed to look up {}", url))?
    {
        return Ok(record.id);
    }

    let record = repository
        .create_url(url)
        .with_context(|| format!("Failed to register {}", url))?;
    Ok(record.id)
}

/// Polls the jobs until all are finished, stopping them on Ctrl-C
async fn wait_for_jobs(service: &CrawlerService, job_ids: &[i64]) {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last_seen: HashMap<i64, (CrawlStatus, String)> = HashMap::new();
    let mut interrupted = false;

    loop {
        tokio::select! {
            signal = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = signal {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                    continue;
                }
                tracing::warn!("Interrupted, stopping active crawls");
                for id in service.get_active_jobs().keys() {
                    if let Err(e) = service.stop_crawl(*id) {
                        tracing::debug!("Could not stop job {}: {}", id, e);
                    }
                }
            }
            _ = ticker.tick() => {}
        }

        let mut pending = false;
        for id in job_ids {
            let Ok(job) = service.get_job_status(*id) else {
                continue;
            };

            let current = (job.status, job.message.clone());
            if last_seen.get(id) != Some(&current) {
                tracing::info!(
                    "[{}] {} {:.0}%: {}",
                    id,
                    job.status,
                    job.progress,
                    job.message
                );
                last_seen.insert(*id, current);
            }

            if !job.is_terminal() {
                pending = true;
            }
        }

        if !pending {
            break;
        }
    }
}
