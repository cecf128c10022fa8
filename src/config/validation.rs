use crate::config::types::{Config, ScraperConfig};
use crate::ConfigError;
use url::Url;

const MAX_CONCURRENCY: u32 = 1000;
const MAX_REQUESTS_PER_SECOND: u32 = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.output_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output_path cannot be empty".to_string(),
        ));
    }

    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.requests_per_second < 1 || config.requests_per_second > MAX_REQUESTS_PER_SECOND {
        return Err(ConfigError::Validation(format!(
            "requests_per_second must be between 1 and {}, got {}",
            MAX_REQUESTS_PER_SECOND, config.requests_per_second
        )));
    }

    validate_source_url(&config.source_url)?;

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    if config.observer_capacity < 1 {
        return Err(ConfigError::Validation(
            "observer_capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a listing URL: must parse and use http or https
pub fn validate_source_url(source_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(source_url.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid source_url '{}': {}", source_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "source_url '{}' must use http or https",
            source_url
        )));
    }

    Ok(())
}
