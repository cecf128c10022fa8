//! HTTP fetcher implementation
//!
//! This module handles every request the scraper makes:
//! - Building the shared HTTP client
//! - Picking a browser user agent per request
//! - Issuing a single GET per tick (no retries)
//! - Classifying the outcome and updating the session counters

use crate::output::SessionCounters;
use rand::Rng;
use reqwest::{header::USER_AGENT, Client, StatusCode};
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Browser strings rotated across requests
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 Version/17.1 Safari/605.1.15",
];

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// HTTP 200 with the page body
    Success {
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Any status other than 200; the body is discarded
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Connection, DNS, timeout, or body read failure
    TransportError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Builds the HTTP client shared by all worker tasks
///
/// The user agent is set per request, not on the client.
///
/// # Arguments
///
/// * `timeout` - Total time allowed for one request, including the body
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Picks one of [`USER_AGENTS`] uniformly at random
pub fn random_user_agent() -> &'static str {
    let index = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Fetches the listing page once and classifies the outcome
///
/// # Counter Effects
///
/// | Outcome | requests | successes | errors | last status |
/// |---------|----------|-----------|--------|-------------|
/// | Success | +1 | +1 | | 200 |
/// | HttpError | +1 | | | status |
/// | TransportError | +1 | | +1 | unchanged, or status if the body read failed |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The listing URL to fetch
/// * `counters` - Session counters to update
///
/// # Returns
///
/// A FetchResult indicating success or the type of failure
pub async fn fetch_page(client: &Client, url: &str, counters: &SessionCounters) -> FetchResult {
    counters.record_request();

    let response = match client
        .get(url)
        .header(USER_AGENT, random_user_agent())
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            counters.record_transport_error();
            return FetchResult::TransportError {
                error: describe_transport_error(&e),
            };
        }
    };

    let status = response.status();
    counters.record_status(status.as_u16());

    if status != StatusCode::OK {
        tracing::debug!("GET {} returned HTTP {}", url, status.as_u16());
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    match response.text().await {
        Ok(body) => {
            counters.record_success();
            FetchResult::Success {
                status_code: status.as_u16(),
                body,
            }
        }
        Err(e) => {
            counters.record_transport_error();
            FetchResult::TransportError {
                error: describe_transport_error(&e),
            }
        }
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
