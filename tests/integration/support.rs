//! Shared fixtures for the integration tests

use s3eker::config::ScraperConfig;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a listing page with one row per `(bucket, file count)` pair
pub fn listing_page(rows: &[(&str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(bucket, count)| {
            format!(
                r#"<tr><td>1</td><td><a href="/files?bucket={}&page=1">{}</a></td><td>{}</td><td>aws</td></tr>"#,
                bucket, bucket, count
            )
        })
        .collect();
    format!(
        r#"<html><body><table class="table table-bordered"><tbody>{}</tbody></table></body></html>"#,
        rows
    )
}

/// Mounts a listing page at `route`, optionally answering slowly
pub async fn mount_listing(server: &MockServer, route: &str, body: String, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html")
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Small, fast scraper configuration pointed at `source_url`
pub fn test_config(source_url: String, output: &Path) -> ScraperConfig {
    ScraperConfig {
        output_path: output.display().to_string(),
        concurrency: 4,
        requests_per_second: 50,
        source_url,
        min_file_count: 1000,
        request_timeout_secs: 5,
        ..ScraperConfig::default()
    }
}

/// Cancels `token` after `after`
pub fn cancel_after(token: &CancellationToken, after: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        token.cancel();
    });
}
