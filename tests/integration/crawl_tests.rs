//! End-to-end session tests against a mock listing site

use crate::support::{cancel_after, listing_page, mount_listing, test_config};
use s3eker::crawler::Session;
use s3eker::storage::{parse_checkpoint, CheckpointShape, FlushOutcome};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_session_merges_new_buckets_into_legacy_checkpoint() {
    let server = MockServer::start().await;
    let body = listing_page(&[
        ("alpha.s3.amazonaws.com", "5,000"),
        ("small.s3.amazonaws.com", "12"),
        ("legacy.s3.amazonaws.com", "9,999"),
        ("gamma.s3.amazonaws.com", "1000"),
    ]);
    mount_listing(&server, "/random/buckets", body, Duration::ZERO).await;

    // Start from a bare-list checkpoint written by an older version
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("merged.json");
    std::fs::write(
        &output,
        r#"[{"full_bucket_url":"legacy.s3.amazonaws.com","file_count":9999,"scraped_at":"2024-01-01T00:00:00Z"}]"#,
    )
    .unwrap();

    let config = test_config(format!("{}/random/buckets", server.uri()), &output);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(300));

    let report = Session::new(config).run(cancel).await.expect("Session failed");

    assert_eq!(report.summary.new_found, 2);
    assert_eq!(report.summary.found, 3);
    assert!(report.summary.total_requests >= 1);
    assert_eq!(report.summary.total_requests, report.summary.successes);
    assert!(matches!(
        report.flush,
        Ok(FlushOutcome::Written {
            total: 3,
            backup: None
        })
    ));

    let content = std::fs::read_to_string(&output).unwrap();
    let loaded = parse_checkpoint(&content).expect("Checkpoint unreadable");
    assert_eq!(loaded.shape, CheckpointShape::Collection);

    let identities: Vec<&str> = loaded.records.iter().map(|r| r.identity()).collect();
    assert_eq!(
        identities,
        vec![
            "legacy.s3.amazonaws.com",
            "alpha.s3.amazonaws.com",
            "gamma.s3.amazonaws.com"
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_drains_in_flight_requests_before_flush() {
    let server = MockServer::start().await;
    let body = listing_page(&[("slow.s3.amazonaws.com", "2000")]);
    mount_listing(&server, "/list", body, Duration::from_millis(400)).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("merged.json");
    let config = test_config(format!("{}/list", server.uri()), &output);

    // Cancel while the first requests are still waiting on the slow server
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(100));

    let start = Instant::now();
    let report = Session::new(config).run(cancel).await.expect("Session failed");

    // The session waited for the slow responses instead of abandoning them
    assert!(start.elapsed() >= Duration::from_millis(400));
    assert!(report.summary.total_requests >= 1);
    assert_eq!(report.summary.pages_completed, report.summary.total_requests);
    assert_eq!(report.summary.successes, report.summary.total_requests);

    // Their insertions made it into the checkpoint
    assert_eq!(report.summary.new_found, 1);
    let content = std::fs::read_to_string(&output).unwrap();
    let records = parse_checkpoint(&content).unwrap().records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity(), "slow.s3.amazonaws.com");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_pool_throttles_request_rate() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/list",
        listing_page(&[]),
        Duration::from_millis(200),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(format!("{}/list", server.uri()), &dir.path().join("out.json"));
    config.concurrency = 1;
    config.requests_per_second = 100;

    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(1000));
    let report = Session::new(config).run(cancel).await.expect("Session failed");

    // 100 ticks/sec, but one slot held ~200ms per request caps it near 5
    assert!(report.summary.total_requests >= 2);
    assert!(
        report.summary.total_requests <= 7,
        "Expected backpressure, got {} requests",
        report.summary.total_requests
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_requests_leave_checkpoint_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("merged.json");
    let original = r#"{"buckets":[{"full_bucket_url":"kept","file_count":5000,"scraped_at":"2024-01-01T00:00:00Z"}]}"#;
    std::fs::write(&output, original).unwrap();
    let modified_before = std::fs::metadata(&output).unwrap().modified().unwrap();

    let config = test_config(format!("{}/list", server.uri()), &output);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(200));
    let report = Session::new(config).run(cancel).await.expect("Session failed");

    assert!(report.summary.total_requests >= 1);
    assert_eq!(report.summary.successes, 0);
    assert_eq!(report.summary.errors, 0);
    assert_eq!(report.summary.last_status, Some(503));
    assert_eq!(report.summary.found, 1);
    assert_eq!(report.summary.success_rate(), 0.0);
    assert!(matches!(report.flush, Ok(FlushOutcome::Skipped)));

    assert_eq!(std::fs::read_to_string(&output).unwrap(), original);
    assert_eq!(
        std::fs::metadata(&output).unwrap().modified().unwrap(),
        modified_before
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unreachable_source_counts_transport_errors() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("merged.json");
    let config = test_config(format!("http://{}/list", addr), &output);

    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(200));
    let report = Session::new(config).run(cancel).await.expect("Session failed");

    assert!(report.summary.total_requests >= 1);
    assert_eq!(report.summary.errors, report.summary.total_requests);
    assert_eq!(report.summary.last_status, None);
    assert!(matches!(report.flush, Ok(FlushOutcome::Skipped)));
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_source_url_change_applies_to_later_ticks() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/first",
        listing_page(&[("first-bucket", "5000")]),
        Duration::ZERO,
    )
    .await;
    mount_listing(
        &server,
        "/second",
        listing_page(&[("second-bucket", "5000")]),
        Duration::ZERO,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("merged.json");
    let config = test_config(format!("{}/first", server.uri()), &output);

    let session = Session::new(config);
    let settings = session.settings();
    let second_url = format!("{}/second", server.uri());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            settings.set_source_url(&second_url).unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        }
    });

    let report = session.run(cancel).await.expect("Session failed");
    assert_eq!(report.summary.new_found, 2);

    let content = std::fs::read_to_string(&output).unwrap();
    let records = parse_checkpoint(&content).unwrap().records;
    let identities: Vec<&str> = records.iter().map(|r| r.identity()).collect();
    assert_eq!(identities, vec!["first-bucket", "second-bucket"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_legacy_records_with_odd_fields_are_kept_on_flush() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/list",
        listing_page(&[("newone", "5000")]),
        Duration::ZERO,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("merged.json");
    std::fs::write(
        &output,
        r#"{"buckets":[
            {"full_bucket_url":"old-1","file_count":2000,"scraped_at":""},
            {"full_bucket_url":"old-2","file_count":-4,"scraped_at":"2024-01-01T12:00:00.123456"}
        ]}"#,
    )
    .unwrap();

    let config = test_config(format!("{}/list", server.uri()), &output);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(200));
    let report = Session::new(config).run(cancel).await.expect("Session failed");

    assert!(matches!(
        report.flush,
        Ok(FlushOutcome::Written {
            total: 3,
            backup: None
        })
    ));

    let content = std::fs::read_to_string(&output).unwrap();
    let records = parse_checkpoint(&content).unwrap().records;
    let identities: Vec<&str> = records.iter().map(|r| r.identity()).collect();
    assert_eq!(identities, vec!["old-1", "old-2", "newone"]);

    // Timestamps this tool cannot parse are written back unchanged
    assert!(content.contains(r#""scraped_at": """#));
    assert!(content.contains(r#""scraped_at": "2024-01-01T12:00:00.123456""#));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unparseable_checkpoint_is_backed_up_before_rewrite() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/list",
        listing_page(&[("newone", "5000")]),
        Duration::ZERO,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("merged.json");
    let original = r#"{"buckets":[{"full_bucket_url":"old-1","file_count":2000"#;
    std::fs::write(&output, original).unwrap();

    let config = test_config(format!("{}/list", server.uri()), &output);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(200));
    let report = Session::new(config).run(cancel).await.expect("Session failed");

    let backup = match report.flush {
        Ok(FlushOutcome::Written {
            total: 1,
            backup: Some(backup),
        }) => backup,
        other => panic!("expected a backed-up write, got {:?}", other),
    };
    assert_eq!(std::fs::read_to_string(backup).unwrap(), original);
}
