//! Storage module for discovery history
//!
//! This module handles:
//! - The in-memory deduplication history shared by all workers
//! - Loading the previous checkpoint at startup
//! - Writing the merged checkpoint on shutdown

mod checkpoint;
mod history;

pub use checkpoint::{
    backup_checkpoint, flush, parse_checkpoint, write_checkpoint, CheckpointError,
    CheckpointShape, FlushOutcome, LoadedCheckpoint,
};
pub use history::HistoryStore;
