//! Stress tests for concurrent discovery of the same buckets

use crate::support::listing_page;
use rand::Rng;
use s3eker::config::LiveSettings;
use s3eker::crawler::{build_http_client, DiscoveryTask};
use s3eker::output::{observer_channel, SessionCounters};
use s3eker::record::BucketRecord;
use s3eker::storage::HistoryStore;
use std::sync::Arc;
use std::time::Duration;

const WORKERS: usize = 64;
const ROUNDS: usize = 20;

fn discovery_task(store: Arc<HistoryStore>, counters: Arc<SessionCounters>) -> DiscoveryTask {
    DiscoveryTask::new(
        build_http_client(Duration::from_secs(1)).unwrap(),
        LiveSettings::new("http://127.0.0.1:9/", 1000),
        &[String::new()],
        store,
        counters,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_same_page_ingested_concurrently_is_stored_once() {
    let page = Arc::new(listing_page(&[
        ("shared-one", "4000"),
        ("shared-two", "1,500"),
        ("too-small", "10"),
    ]));

    for round in 0..ROUNDS {
        let store = Arc::new(HistoryStore::new());
        let counters = Arc::new(SessionCounters::new(0));
        let task = discovery_task(Arc::clone(&store), Arc::clone(&counters));

        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let task = task.clone();
                let page = Arc::clone(&page);
                let jitter = Duration::from_micros(rand::thread_rng().gen_range(0..500));
                tokio::spawn(async move {
                    tokio::time::sleep(jitter).await;
                    task.ingest(&page)
                })
            })
            .collect();

        let mut added = 0;
        for handle in handles {
            added += handle.await.unwrap();
        }

        assert_eq!(added, 2, "round {}", round);
        assert_eq!(store.len(), 2, "round {}", round);
        assert_eq!(counters.new_found(), 2, "round {}", round);
        assert_eq!(counters.found(), 2, "round {}", round);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_inserts_have_exactly_one_winner() {
    for round in 0..ROUNDS {
        let store = Arc::new(HistoryStore::new());

        let handles: Vec<_> = (0..WORKERS)
            .map(|i| {
                let store = Arc::clone(&store);
                let jitter = Duration::from_micros(rand::thread_rng().gen_range(0..200));
                tokio::spawn(async move {
                    tokio::time::sleep(jitter).await;
                    store.insert(BucketRecord::discovered_now("contested", i as u64))
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1, "round {}", round);
        assert_eq!(store.len(), 1, "round {}", round);
        assert!(store.contains("contested"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_observer_sees_each_new_bucket_once() {
    let page = Arc::new(listing_page(&[("watched", "9000")]));
    let store = Arc::new(HistoryStore::new());
    let counters = Arc::new(SessionCounters::new(0));
    let (observer, mut receiver) = observer_channel(WORKERS);
    let task = discovery_task(store, counters).with_observer(observer);

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let task = task.clone();
            let page = Arc::clone(&page);
            tokio::spawn(async move { task.ingest(&page) })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }
    drop(task);

    let mut seen = Vec::new();
    while let Some(record) = receiver.recv().await {
        seen.push(record.identity().to_string());
    }
    assert_eq!(seen, vec!["watched"]);
}
