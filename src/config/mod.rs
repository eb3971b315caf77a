//! Configuration module for the analyzer
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use url_analyzer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("url-analyzer.toml")).unwrap();
//! println!("Concurrent link checks: {}", config.crawler.concurrent_checks);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlOptions, StorageConfig, DEFAULT_USER_AGENT};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::validate_crawl_options;
