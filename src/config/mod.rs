//! Configuration module for s3eker
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, plus the settings that can change mid-session.
//!
//! # Example
//!
//! ```no_run
//! use s3eker::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("s3eker.toml")).unwrap();
//! println!("Polling {}", config.scraper.source_url);
//! ```

mod live;
mod parser;
mod types;
mod validation;

// Re-export types
pub use live::LiveSettings;
pub use types::{Config, ScraperConfig, DEFAULT_OUTPUT_PATH, DEFAULT_SOURCE_URL};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_source_url};
