use crate::config::types::{Config, FetcherConfig, OutputConfig, ResourceConfig, WalkerConfig};
use crate::ConfigError;
use scraper::Selector;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_walker_config(&config.walker)?;
    validate_resource_config(&config.resources)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates walker configuration
fn validate_walker_config(config: &WalkerConfig) -> Result<(), ConfigError> {
    validate_selector(&config.content_selector)?;

    for selector in config.next_selectors.iter().chain(&config.strip_selectors) {
        validate_selector(selector)?;
    }

    for selector in [&config.content_start_after, &config.content_end_before_last] {
        if !selector.is_empty() {
            validate_selector(selector)?;
        }
    }

    if config.next_link_labels.iter().any(|l| l.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "next-link-labels cannot contain empty labels".to_string(),
        ));
    }

    if config.max_chapters < 1 {
        return Err(ConfigError::Validation(format!(
            "max-chapters must be >= 1, got {}",
            config.max_chapters
        )));
    }

    Ok(())
}

/// Validates resource configuration
fn validate_resource_config(config: &ResourceConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-downloads must be between 1 and 64, got {}",
            config.max_concurrent_downloads
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a CSS selector parses
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
