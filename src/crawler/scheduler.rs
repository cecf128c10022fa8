//! Pacing clock and bounded worker pool
//!
//! This module handles:
//! - A fixed-size pool of worker slots backed by a semaphore
//! - A fixed-interval clock that paces how often a slot is requested
//! - Backpressure: when every slot is busy the clock waits for one to free
//! - Stopping promptly when the session is cancelled

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One unit of the concurrency budget
///
/// The slot returns to the pool when dropped.
#[derive(Debug)]
pub struct PoolSlot {
    _permit: OwnedSemaphorePermit,
}

/// Fixed-size set of worker slots
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    /// Creates a pool with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until a slot is free and takes it
    ///
    /// Returns `None` only if the pool has been closed.
    pub async fn acquire(&self) -> Option<PoolSlot> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .ok()
            .map(|permit| PoolSlot { _permit: permit })
    }

    /// Takes a slot if one is free right now
    pub fn try_acquire(&self) -> Option<PoolSlot> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| PoolSlot { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }
}

/// Pacing clock paired with the worker pool
///
/// Must be created inside a Tokio runtime.
pub struct Scheduler {
    pool: WorkerPool,
    ticker: Interval,
    period: Duration,
}

impl Scheduler {
    /// Creates a scheduler ticking `requests_per_second` times a second
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Number of worker slots
    /// * `requests_per_second` - Tick rate; treated as 1 if zero
    pub fn new(concurrency: usize, requests_per_second: u32) -> Self {
        let period = tick_period(requests_per_second);
        let mut ticker = interval(period);
        // Slow slot acquisition must lower the rate, not cause a burst afterwards
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            pool: WorkerPool::new(concurrency),
            ticker,
            period,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits for the next tick, then for a free slot
    ///
    /// # Returns
    ///
    /// * `Some(PoolSlot)` - A slot to hand to the next task
    /// * `None` - The session was cancelled before a slot was obtained
    pub async fn next_slot(&mut self, cancel: &CancellationToken) -> Option<PoolSlot> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = self.ticker.tick() => {}
        }

        if let Some(slot) = self.pool.try_acquire() {
            return Some(slot);
        }

        tracing::trace!("All {} slots busy, waiting", self.pool.capacity());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            slot = self.pool.acquire() => slot,
        }
    }
}

/// Interval between ticks for a given request rate
pub fn tick_period(requests_per_second: u32) -> Duration {
    Duration::from_secs(1) / requests_per_second.max(1)
}
