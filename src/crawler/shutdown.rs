//! Session lifecycle and interrupt handling
//!
//! A session ends only when it is cancelled. The shutdown order is fixed:
//! stop the dispatcher, wait for it to drain, flush the checkpoint once,
//! and hand back the summary.

use crate::config::{LiveSettings, ScraperConfig};
use crate::crawler::coordinator::Dispatcher;
use crate::crawler::fetcher::build_http_client;
use crate::output::{DiscoveryObserver, SessionCounters, SessionSummary};
use crate::storage::{flush, CheckpointError, FlushOutcome, HistoryStore};
use crate::SeekerError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What a finished session produced
#[derive(Debug)]
pub struct SessionReport {
    /// Final counter values, read after every task finished
    pub summary: SessionSummary,

    /// Outcome of the exit-time checkpoint
    pub flush: Result<FlushOutcome, CheckpointError>,

    /// Where the checkpoint lives
    pub output_path: PathBuf,

    /// Records the discovery observer never received, if one was attached
    pub observer_dropped: Option<u64>,
}

/// One scraping session from history load to checkpoint
pub struct Session {
    config: ScraperConfig,
    settings: LiveSettings,
    observer: Option<DiscoveryObserver>,
}

impl Session {
    pub fn new(config: ScraperConfig) -> Self {
        let settings = LiveSettings::from_config(&config);
        Self {
            config,
            settings,
            observer: None,
        }
    }

    /// Handle for changing the source URL or threshold while running
    pub fn settings(&self) -> LiveSettings {
        self.settings.clone()
    }

    pub fn with_observer(mut self, observer: DiscoveryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Runs until `cancel` fires, then drains and checkpoints
    ///
    /// # Returns
    ///
    /// * `Ok(SessionReport)` - The session ended; a failed checkpoint write is
    ///   reported inside the report, not as an error
    /// * `Err(SeekerError)` - The session could not start
    pub async fn run(self, cancel: CancellationToken) -> Result<SessionReport, SeekerError> {
        let output_path = PathBuf::from(&self.config.output_path);

        tracing::info!("Loading existing buckets for deduplication...");
        let store = Arc::new(HistoryStore::load(&output_path));
        tracing::info!("Loaded {} existing buckets", store.loaded_count());

        let counters = Arc::new(SessionCounters::new(store.loaded_count() as u64));
        let client = build_http_client(Duration::from_secs(self.config.request_timeout_secs))?;

        let mut dispatcher = Dispatcher::new(
            &self.config,
            self.settings,
            Arc::clone(&store),
            Arc::clone(&counters),
            client,
        );
        let observer_stats = self.observer.clone();
        if let Some(observer) = self.observer {
            dispatcher = dispatcher.with_observer(observer);
        }

        dispatcher.run(cancel).await?;

        let checkpoint = flush(&store, &counters, &output_path);
        if let Err(e) = &checkpoint {
            tracing::error!("Error writing output file: {}", e);
        }

        Ok(SessionReport {
            summary: counters.snapshot(),
            flush: checkpoint,
            output_path,
            observer_dropped: observer_stats.map(|observer| observer.dropped()),
        })
    }
}

/// Cancels `token` the first time the process receives SIGINT or SIGTERM
pub fn listen_for_shutdown(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = wait_for_signal() => {
                tracing::warn!("{} received, stopping...", signal);
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            _ = ctrl_c() => "Interrupt",
            _ = terminate.recv() => "Terminate signal",
        },
        Err(e) => {
            tracing::warn!("Could not listen for SIGTERM: {}", e);
            ctrl_c().await;
            "Interrupt"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await;
    "Interrupt"
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler the session can only end by other means
        tracing::error!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Runs a session until the process is interrupted
///
/// # Example
///
/// ```no_run
/// use s3eker::config::ScraperConfig;
/// use s3eker::crawler::run_session;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_session(ScraperConfig::default(), None).await?;
/// println!("{} new buckets", report.summary.new_found);
/// # Ok(())
/// # }
/// ```
pub async fn run_session(
    config: ScraperConfig,
    observer: Option<DiscoveryObserver>,
) -> Result<SessionReport, SeekerError> {
    let cancel = CancellationToken::new();
    let listener = listen_for_shutdown(cancel.clone());

    let mut session = Session::new(config);
    if let Some(observer) = observer {
        session = session.with_observer(observer);
    }
    let result = session.run(cancel.clone()).await;

    // Stops the listener if the session ended for another reason
    cancel.cancel();
    let _ = listener.await;
    result
}
