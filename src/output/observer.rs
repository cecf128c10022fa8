//! Best-effort stream of newly discovered buckets
//!
//! Workers hand each new record to the observer without waiting. When the
//! channel is full (or nobody is listening any more) the record is dropped
//! for the observer only; the history store already holds it.

use crate::record::BucketRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Sending half handed to worker tasks
#[derive(Debug, Clone)]
pub struct DiscoveryObserver {
    sender: mpsc::Sender<BucketRecord>,
    dropped: Arc<AtomicU64>,
}

impl DiscoveryObserver {
    /// Offers a record to the observer; never blocks
    ///
    /// Returns `true` if the record was queued.
    pub fn notify(&self, record: &BucketRecord) -> bool {
        match self.sender.try_send(record.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Number of records the observer never received
    ///
    /// Shown in the end-of-session summary when records were skipped.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Creates an observer and its receiving end with room for `capacity` records
pub fn observer_channel(capacity: usize) -> (DiscoveryObserver, mpsc::Receiver<BucketRecord>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        DiscoveryObserver {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        receiver,
    )
}

/// Logs every record received until all observers are dropped
pub async fn log_discoveries(mut receiver: mpsc::Receiver<BucketRecord>) {
    while let Some(record) = receiver.recv().await {
        tracing::info!(
            "New bucket: {} ({} files)",
            record.identity(),
            record.file_count()
        );
    }
}
