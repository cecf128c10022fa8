//! In-memory deduplication history
//!
//! The identity set and the ordered record list live behind one mutex so
//! they can never disagree. The lock is only held for the check-then-insert
//! sequence, never across a network call.

use crate::record::{BucketCollection, BucketRecord};
use crate::storage::checkpoint::parse_checkpoint;
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct HistoryInner {
    seen: HashSet<String>,
    records: Vec<BucketRecord>,
}

impl HistoryInner {
    fn insert(&mut self, record: BucketRecord) -> bool {
        if self.seen.contains(record.identity()) {
            return false;
        }
        self.seen.insert(record.identity().to_string());
        self.records.push(record);
        true
    }
}

/// Set of known buckets plus every record accumulated so far
#[derive(Debug, Default)]
pub struct HistoryStore {
    inner: Mutex<HistoryInner>,
    loaded: usize,
    /// An existing checkpoint was not loaded in full
    partial: bool,
}

impl HistoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with existing records
    ///
    /// Later duplicates of an identity are discarded.
    pub fn from_records(records: impl IntoIterator<Item = BucketRecord>) -> Self {
        let mut inner = HistoryInner::default();
        let mut duplicates = 0usize;
        for record in records {
            if !inner.insert(record) {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            tracing::warn!("Dropped {} duplicate records from history", duplicates);
        }

        let loaded = inner.records.len();
        Self {
            inner: Mutex::new(inner),
            loaded,
            partial: false,
        }
    }

    fn mark_partial(mut self) -> Self {
        self.partial = true;
        self
    }

    /// Loads history from a checkpoint file
    ///
    /// A missing file yields an empty store. An unreadable or unparseable
    /// file also yields an empty store, marked partial so the next flush
    /// keeps a copy of it.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No checkpoint at {}, starting fresh", path.display());
                Self::new()
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read checkpoint {}: {}, starting fresh",
                    path.display(),
                    e
                );
                Self::new().mark_partial()
            }
        }
    }

    /// Builds a store from checkpoint text in either accepted shape
    ///
    /// Entries that cannot be read are left out and mark the store partial.
    pub fn from_json(content: &str) -> Self {
        match parse_checkpoint(content) {
            Some(loaded) => {
                tracing::debug!(
                    "Loaded {} records from {:?} checkpoint",
                    loaded.records.len(),
                    loaded.shape
                );
                let store = Self::from_records(loaded.records);
                if loaded.rejected > 0 {
                    tracing::warn!("{} checkpoint entries could not be read", loaded.rejected);
                    store.mark_partial()
                } else {
                    store
                }
            }
            None => {
                tracing::warn!("Checkpoint could not be parsed, starting fresh");
                Self::new().mark_partial()
            }
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.lock().seen.contains(identity)
    }

    /// Adds a record unless its identity is already known
    ///
    /// Returns `true` if the record was added. Concurrent callers racing on
    /// the same identity see exactly one `true`.
    pub fn insert(&self, record: BucketRecord) -> bool {
        self.lock().insert(record)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records that came from the checkpoint at startup
    pub fn loaded_count(&self) -> usize {
        self.loaded
    }

    /// True when an existing checkpoint could not be loaded in full, so
    /// rewriting it would lose entries
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Copy of all records in insertion order
    pub fn records(&self) -> Vec<BucketRecord> {
        self.lock().records.clone()
    }

    /// Snapshot of the store as a checkpoint document stamped now
    pub fn export(&self) -> BucketCollection {
        BucketCollection::new(self.records(), Utc::now())
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
