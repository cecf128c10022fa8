//! JSON checkpoint reading and writing
//!
//! Two document shapes are accepted when reading:
//! - the wrapped collection written by this tool
//! - a bare array of records, as written by older versions
//!
//! Only the wrapped shape is ever written.

use crate::output::SessionCounters;
use crate::record::{BucketCollection, BucketRecord};
use crate::storage::HistoryStore;
use chrono::Utc;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keys that may hold the record list of a wrapped checkpoint
const RECORD_LIST_KEYS: [&str; 2] = ["buckets", "records"];

/// Errors that can occur while writing a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to write checkpoint {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to back up checkpoint to {path}: {source}")]
    Backup {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which document shape a checkpoint was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointShape {
    Collection,
    BareList,
}

/// Records read from a checkpoint document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedCheckpoint {
    pub records: Vec<BucketRecord>,
    pub shape: CheckpointShape,

    /// Entries that could not be read as a record and were left out
    pub rejected: usize,
}

/// Result of a flush attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing new this session; the file was left alone
    Skipped,

    /// The checkpoint was rewritten with `total` records
    ///
    /// `backup` holds a copy of the previous file when it was not loaded in
    /// full.
    Written {
        total: usize,
        backup: Option<PathBuf>,
    },
}

/// Parses checkpoint text in either accepted shape
///
/// Entries are read one at a time, so a single bad entry only drops that
/// entry and is counted in `rejected`. Returns `None` when the text is not
/// JSON, or is neither an array nor an object holding a record list.
pub fn parse_checkpoint(content: &str) -> Option<LoadedCheckpoint> {
    let document: Value = match serde_json::from_str(content) {
        Ok(document) => document,
        Err(e) => {
            tracing::debug!("Checkpoint is not valid JSON: {}", e);
            return None;
        }
    };

    let (entries, shape) = match document {
        Value::Array(entries) => (entries, CheckpointShape::BareList),
        Value::Object(fields) => match take_record_list(fields) {
            Some(entries) => (entries, CheckpointShape::Collection),
            None => {
                tracing::debug!("Checkpoint object has no record list");
                return None;
            }
        },
        _ => {
            tracing::debug!("Checkpoint is neither a collection nor a list");
            return None;
        }
    };

    let mut records = Vec::with_capacity(entries.len());
    let mut rejected = 0;
    for entry in entries {
        match serde_json::from_value::<BucketRecord>(entry) {
            Ok(record) => records.push(record),
            Err(e) => {
                rejected += 1;
                tracing::warn!("Skipping unreadable checkpoint entry: {}", e);
            }
        }
    }

    Some(LoadedCheckpoint {
        records,
        shape,
        rejected,
    })
}

fn take_record_list(mut fields: Map<String, Value>) -> Option<Vec<Value>> {
    RECORD_LIST_KEYS
        .iter()
        .find_map(|key| match fields.remove(*key) {
            Some(Value::Array(entries)) => Some(entries),
            _ => None,
        })
}

/// Serializes a collection to `path`, replacing any previous content
pub fn write_checkpoint(collection: &BucketCollection, path: &Path) -> Result<(), CheckpointError> {
    let mut json = serde_json::to_string_pretty(collection)?;
    json.push('\n');

    std::fs::write(path, json).map_err(|source| CheckpointError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Copies `path` next to itself as `<name>.<timestamp>.bak`
pub fn backup_checkpoint(path: &Path) -> Result<PathBuf, CheckpointError> {
    let mut name = path.file_name().unwrap_or(path.as_os_str()).to_os_string();
    name.push(format!(".{}.bak", Utc::now().format("%Y%m%d%H%M%S")));
    let backup = path.with_file_name(name);

    std::fs::copy(path, &backup).map_err(|source| CheckpointError::Backup {
        path: backup.display().to_string(),
        source,
    })?;

    tracing::warn!(
        "Previous checkpoint was not loaded in full, kept a copy at {}",
        backup.display()
    );
    Ok(backup)
}

/// Writes the merged history to `path` if this session found anything new
///
/// If the history could not load every entry of an existing file, that file
/// is backed up first; when the backup fails nothing is written.
///
/// Must only be called once every worker has finished, so the export cannot
/// race an in-flight insert.
pub fn flush(
    store: &HistoryStore,
    counters: &SessionCounters,
    path: &Path,
) -> Result<FlushOutcome, CheckpointError> {
    if counters.new_found() == 0 {
        tracing::info!("No new buckets to save, leaving {} untouched", path.display());
        return Ok(FlushOutcome::Skipped);
    }

    let backup = if store.is_partial() && path.exists() {
        Some(backup_checkpoint(path)?)
    } else {
        None
    };

    let collection = store.export();
    write_checkpoint(&collection, path)?;

    tracing::info!(
        "Saved {} buckets ({} new) to {}",
        collection.total_count,
        counters.new_found(),
        path.display()
    );

    Ok(FlushOutcome::Written {
        total: collection.total_count,
        backup,
    })
}
