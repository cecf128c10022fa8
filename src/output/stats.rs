//! Session counters and the final summary
//!
//! Counters are shared between the pacing loop and every worker task, so each
//! one is an independent atomic. Values read mid-session are approximate; the
//! summary is read after all workers have drained and is exact.

use crate::crawler::SessionReport;
use crate::storage::FlushOutcome;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

/// Process-wide tallies for one scraping session
#[derive(Debug, Default)]
pub struct SessionCounters {
    requests: AtomicU64,
    successes: AtomicU64,
    errors: AtomicU64,
    found: AtomicU64,
    new_found: AtomicU64,
    pages_completed: AtomicU64,
    /// 0 until the first response with a status arrives
    last_status: AtomicU16,
}

impl SessionCounters {
    /// Creates counters whose `found` total starts at the number of records
    /// already present in the loaded history
    pub fn new(loaded: u64) -> Self {
        Self {
            found: AtomicU64::new(loaded),
            ..Self::default()
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status(&self, status: u16) {
        self.last_status.store(status, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one newly inserted bucket
    pub fn record_discovery(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
        self.new_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a finished task and returns the updated page count
    pub fn record_page_completed(&self) -> u64 {
        self.pages_completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    pub fn new_found(&self) -> u64 {
        self.new_found.load(Ordering::Relaxed)
    }

    pub fn last_status(&self) -> Option<u16> {
        match self.last_status.load(Ordering::Relaxed) {
            0 => None,
            status => Some(status),
        }
    }

    pub fn snapshot(&self) -> SessionSummary {
        SessionSummary {
            total_requests: self.requests(),
            successes: self.successes(),
            errors: self.errors(),
            found: self.found(),
            new_found: self.new_found(),
            pages_completed: self.pages_completed.load(Ordering::Relaxed),
            last_status: self.last_status(),
        }
    }
}

/// Point-in-time copy of the session counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub total_requests: u64,
    pub successes: u64,
    pub errors: u64,
    pub found: u64,
    pub new_found: u64,
    pub pages_completed: u64,
    pub last_status: Option<u16>,
}

impl SessionSummary {
    /// Returns the success rate as a percentage of requests issued
    pub fn success_rate(&self) -> f64 {
        (self.successes as f64 / self.total_requests.max(1) as f64) * 100.0
    }

    /// One-line progress description
    pub fn progress_line(&self) -> String {
        let status = self
            .last_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "Pages: {} | New: {} | Total: {} | HTTP: {} | Errors: {}",
            self.total_requests, self.new_found, self.found, status, self.errors
        )
    }
}

/// End-of-session report lines
///
/// The save line reflects what actually happened to the checkpoint, so a
/// failed write is never reported as saved.
pub fn summary_lines(report: &SessionReport) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = vec![format!(
        "Done! Total: {} | New Found: {} | Success rate: {:.1}%",
        summary.total_requests,
        summary.new_found,
        summary.success_rate()
    )];

    match &report.flush {
        Ok(FlushOutcome::Written { backup, .. }) => {
            lines.push(format!(
                "Added {} new buckets to {}",
                summary.new_found,
                report.output_path.display()
            ));
            if let Some(backup) = backup {
                lines.push(format!("Previous file kept at {}", backup.display()));
            }
        }
        Ok(FlushOutcome::Skipped) => lines.push("No new buckets to save".to_string()),
        Err(e) => lines.push(format!(
            "{} new buckets were NOT saved to {}: {}",
            summary.new_found,
            report.output_path.display(),
            e
        )),
    }

    if let Some(dropped) = report.observer_dropped.filter(|dropped| *dropped > 0) {
        lines.push(format!("Watch stream skipped {} buckets", dropped));
    }

    lines
}

/// Prints the end-of-session summary to stdout
pub fn print_summary(report: &SessionReport) {
    println!();
    for line in summary_lines(report) {
        println!("{}", line);
    }
}
