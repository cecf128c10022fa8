use crate::crawler::DEFAULT_REQUEST_TIMEOUT;
use serde::Deserialize;

/// Default listing page polled for buckets
pub const DEFAULT_SOURCE_URL: &str = "https://buckets.grayhatwarfare.com/random/buckets";

/// Default checkpoint file
pub const DEFAULT_OUTPUT_PATH: &str = "merged_deduplicated.json";

/// Main configuration structure for s3eker
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
}

/// Scraper behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Path of the JSON checkpoint that is loaded at startup and rewritten on exit
    #[serde(rename = "output-path")]
    pub output_path: String,

    /// Maximum number of fetch tasks running at once
    pub concurrency: u32,

    /// Pacing clock rate; one tick per `1s / requests_per_second`
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: u32,

    /// Listing page to poll
    #[serde(rename = "source-url")]
    pub source_url: String,

    /// Buckets listing fewer files than this are ignored
    #[serde(rename = "min-file-count")]
    pub min_file_count: u64,

    /// Identity must contain one of these (lower-cased); `""` accepts everything
    pub keywords: Vec<String>,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Log a progress line every this many completed pages
    #[serde(rename = "progress-interval")]
    pub progress_interval: u64,

    /// Buffer size of the discovery observer channel
    #[serde(rename = "observer-capacity")]
    pub observer_capacity: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            concurrency: 200,
            requests_per_second: 100,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            min_file_count: 1000,
            keywords: vec![String::new()],
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            progress_interval: 10,
            observer_capacity: 256,
        }
    }
}
