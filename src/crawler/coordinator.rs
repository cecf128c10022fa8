//! Dispatcher - main scrape orchestration logic
//!
//! This module contains the pacing loop that coordinates the session:
//! - Requesting a worker slot on every tick of the pacing clock
//! - Spawning one fetch + parse + insert task per slot
//! - Stopping on cancellation and draining every in-flight task

use crate::config::{LiveSettings, ScraperConfig};
use crate::crawler::fetcher::{fetch_page, FetchResult};
use crate::crawler::parser::{parse_listing, ListingFilter};
use crate::crawler::scheduler::Scheduler;
use crate::output::{DiscoveryObserver, ProgressReporter, SessionCounters};
use crate::storage::HistoryStore;
use crate::SeekerError;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatcherState {
    /// Created, not started
    Idle,

    /// Ticking and spawning tasks
    Running,

    /// No new ticks; waiting for in-flight tasks
    Draining,

    /// Every task has finished
    Stopped,
}

impl DispatcherState {
    /// Returns true if `next` directly follows this state
    pub fn can_transition_to(self, next: DispatcherState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }
}

/// Work done on one tick: fetch the listing, parse it, record new buckets
///
/// Cheap to clone; every field is shared.
#[derive(Debug, Clone)]
pub struct DiscoveryTask {
    client: Client,
    settings: LiveSettings,
    keywords: Arc<[String]>,
    store: Arc<HistoryStore>,
    counters: Arc<SessionCounters>,
    observer: Option<DiscoveryObserver>,
}

impl DiscoveryTask {
    pub fn new(
        client: Client,
        settings: LiveSettings,
        keywords: &[String],
        store: Arc<HistoryStore>,
        counters: Arc<SessionCounters>,
    ) -> Self {
        Self {
            client,
            settings,
            keywords: keywords.into(),
            store,
            counters,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: DiscoveryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Fetches the current source URL once and ingests the page
    ///
    /// Returns the number of buckets that were new to the history.
    pub async fn run(&self) -> usize {
        let url = self.settings.source_url();

        match fetch_page(&self.client, &url, &self.counters).await {
            FetchResult::Success { body, .. } => self.ingest(&body),
            FetchResult::HttpError { status_code } => {
                tracing::trace!("Tick discarded, HTTP {}", status_code);
                0
            }
            FetchResult::TransportError { error } => {
                tracing::debug!("Tick discarded: {}", error);
                0
            }
        }
    }

    /// Parses a listing page and inserts every candidate not seen before
    ///
    /// Returns the number of buckets added.
    pub fn ingest(&self, body: &str) -> usize {
        let filter = ListingFilter::new(self.settings.min_file_count(), &self.keywords);
        let now = Utc::now();
        let mut added = 0;

        for candidate in parse_listing(body, &filter) {
            let record = candidate.into_record(now);
            if !self.store.insert(record.clone()) {
                continue;
            }

            added += 1;
            self.counters.record_discovery();
            tracing::debug!(
                "Found {} ({} files)",
                record.identity(),
                record.file_count()
            );
            if let Some(observer) = &self.observer {
                observer.notify(&record);
            }
        }

        added
    }
}

/// Owns the pacing loop and the set of running tasks
pub struct Dispatcher {
    task: DiscoveryTask,
    progress: ProgressReporter,
    concurrency: usize,
    requests_per_second: u32,
    state: DispatcherState,
}

impl Dispatcher {
    /// Creates an idle dispatcher
    ///
    /// # Arguments
    ///
    /// * `config` - Concurrency, rate, keyword, and progress settings
    /// * `settings` - Source URL and threshold, read fresh by every task
    /// * `store` - History shared with every task
    /// * `counters` - Session counters shared with every task
    /// * `client` - HTTP client shared with every task
    pub fn new(
        config: &ScraperConfig,
        settings: LiveSettings,
        store: Arc<HistoryStore>,
        counters: Arc<SessionCounters>,
        client: Client,
    ) -> Self {
        Self {
            task: DiscoveryTask::new(client, settings, &config.keywords, store, counters),
            progress: ProgressReporter::new(config.progress_interval),
            concurrency: config.concurrency as usize,
            requests_per_second: config.requests_per_second,
            state: DispatcherState::Idle,
        }
    }

    /// Streams every newly inserted record to `observer` (best-effort)
    pub fn with_observer(mut self, observer: DiscoveryObserver) -> Self {
        self.task = self.task.with_observer(observer);
        self
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Runs until `cancel` fires, then waits for every in-flight task
    ///
    /// A task that already started its request runs to completion. A tick
    /// still waiting for a slot when cancellation arrives is never issued.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The dispatcher reached `Stopped`
    /// * `Err(SeekerError)` - The dispatcher was not idle
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), SeekerError> {
        self.transition(DispatcherState::Running)?;
        tracing::info!(
            "Dispatching with {} workers at {} requests/sec",
            self.concurrency,
            self.requests_per_second
        );

        let mut scheduler = Scheduler::new(self.concurrency, self.requests_per_second);
        let mut tasks = JoinSet::new();

        while let Some(slot) = scheduler.next_slot(&cancel).await {
            let task = self.task.clone();
            let progress = self.progress;
            tasks.spawn(async move {
                task.run().await;
                drop(slot);
                progress.page_completed(&task.counters);
            });

            // Reap finished tasks so the set only holds in-flight work
            while let Some(result) = tasks.try_join_next() {
                log_task_result(result);
            }
        }

        self.transition(DispatcherState::Draining)?;
        tracing::info!("Stopping, waiting for {} in-flight requests", tasks.len());

        while let Some(result) = tasks.join_next().await {
            log_task_result(result);
        }

        self.transition(DispatcherState::Stopped)?;
        tracing::debug!("Dispatcher stopped");
        Ok(())
    }

    fn transition(&mut self, next: DispatcherState) -> Result<(), SeekerError> {
        if !self.state.can_transition_to(next) {
            return Err(SeekerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Dispatcher {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }
}

fn log_task_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("Worker task panicked: {}", e);
        } else {
            tracing::warn!("Worker task did not finish: {}", e);
        }
    }
}
