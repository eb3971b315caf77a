use crate::config::types::{Config, CrawlOptions, StorageConfig};
use crate::{ConfigError, ConfigResult};

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawl_options(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates crawl engine options
pub fn validate_crawl_options(options: &CrawlOptions) -> ConfigResult<()> {
    if options.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be greater than 0".to_string(),
        ));
    }

    if options.max_redirects > 20 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be at most 20, got {}",
            options.max_redirects
        )));
    }

    if options.concurrent_checks < 1 || options.concurrent_checks > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrent_checks must be between 1 and 100, got {}",
            options.concurrent_checks
        )));
    }

    if options.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> ConfigResult<()> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
