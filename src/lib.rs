//! s3eker: a rate-limited open-bucket discovery scraper
//!
//! This crate polls a bucket listing page, extracts bucket references and
//! file counts from its HTML table, deduplicates them against a persisted
//! history, and checkpoints the merged set to disk on shutdown.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for s3eker operations
#[derive(Debug, Error)]
pub enum SeekerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] storage::CheckpointError),

    #[error("Invalid dispatcher transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crawler::DispatcherState,
        to: crawler::DispatcherState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for s3eker operations
pub type Result<T> = std::result::Result<T, SeekerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, LiveSettings};
pub use record::{BucketCollection, BucketRecord};
pub use storage::HistoryStore;
