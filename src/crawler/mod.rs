//! Crawler module for the discovery pipeline
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching with outcome classification
//! - Listing table parsing and filtering
//! - Pacing and the bounded worker pool
//! - The dispatcher and its drain-on-cancel protocol
//! - Session lifecycle and interrupt handling

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod shutdown;

pub use coordinator::{DiscoveryTask, Dispatcher, DispatcherState};
pub use fetcher::{
    build_http_client, fetch_page, random_user_agent, FetchResult, DEFAULT_REQUEST_TIMEOUT,
    USER_AGENTS,
};
pub use parser::{
    decode_bucket_param, extract_bucket_param, parse_file_count, parse_listing, BucketCandidate,
    ListingFilter,
};
pub use scheduler::{tick_period, PoolSlot, Scheduler, WorkerPool};
pub use shutdown::{listen_for_shutdown, run_session, Session, SessionReport};
