//! Output module for session reporting
//!
//! This module handles:
//! - Session counters and the final summary
//! - Periodic progress lines
//! - The best-effort discovery observer stream

pub mod observer;
pub mod stats;

pub use observer::{log_discoveries, observer_channel, DiscoveryObserver};
pub use stats::{print_summary, summary_lines, SessionCounters, SessionSummary};

/// Emits a progress line every `interval` completed pages
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    interval: u64,
}

impl ProgressReporter {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }

    /// Reports one finished page; logs when the page count hits the interval
    ///
    /// Returns `true` if a line was emitted.
    pub fn page_completed(&self, counters: &SessionCounters) -> bool {
        let pages = counters.record_page_completed();
        if pages % self.interval == 0 {
            tracing::info!("{}", counters.snapshot().progress_line());
            true
        } else {
            tracing::trace!("Page {} completed", pages);
            false
        }
    }
}
