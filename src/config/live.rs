//! Settings that may change while a session is running
//!
//! Worker tasks read the source URL and file-count threshold when they start,
//! so an update applies from the next tick onward.
//!
//! The command-line binary never changes them; programs embedding the crate
//! get the handle from `Session::settings` and may update it mid-run.

use crate::config::types::ScraperConfig;
use crate::config::validation::validate_source_url;
use crate::ConfigError;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
struct LiveValues {
    source_url: String,
    min_file_count: u64,
}

/// Shared handle to the runtime-adjustable settings
#[derive(Debug, Clone)]
pub struct LiveSettings {
    inner: Arc<RwLock<LiveValues>>,
}

impl LiveSettings {
    pub fn new(source_url: impl Into<String>, min_file_count: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LiveValues {
                source_url: source_url.into(),
                min_file_count,
            })),
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.source_url.trim(), config.min_file_count)
    }

    pub fn source_url(&self) -> String {
        self.read(|v| v.source_url.clone())
    }

    pub fn min_file_count(&self) -> u64 {
        self.read(|v| v.min_file_count)
    }

    /// Replaces the listing URL; empty or non-http(s) values are rejected
    pub fn set_source_url(&self, source_url: &str) -> Result<(), ConfigError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(ConfigError::InvalidUrl("source_url cannot be empty".to_string()));
        }
        validate_source_url(source_url)?;

        let mut values = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!("Source URL changed: {} -> {}", values.source_url, source_url);
        values.source_url = source_url.to_string();
        Ok(())
    }

    pub fn set_min_file_count(&self, min_file_count: u64) {
        let mut values = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(
            "Minimum file count changed: {} -> {}",
            values.min_file_count,
            min_file_count
        );
        values.min_file_count = min_file_count;
    }

    fn read<T>(&self, f: impl FnOnce(&LiveValues) -> T) -> T {
        let values = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&values)
    }
}
