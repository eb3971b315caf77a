use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Every key is optional; missing keys fall back to the documented defaults.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use url_analyzer::config::load_config;
///
/// let config = load_config(Path::new("url-analyzer.toml")).unwrap();
/// println!("Timeout: {}s", config.crawler.timeout_secs);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the configuration at `path`, or the defaults when no path is given
pub fn load_config_or_default(path: Option<&Path>) -> ConfigResult<Config> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}
