//! Concurrency Limiter
//!
//! Runs a collection of asynchronous operations with at most `K` in flight.
//! Permits come from a fair `tokio::sync::Semaphore`, so queued operations
//! start in the order they were submitted as slots free up.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{trace, warn};

/// Bounded-parallelism gate
///
/// Cloning shares the same slot pool. A running operation keeps its slot
/// until it completes; there is no timeout or cancellation at this level.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    /// Slot pool; one permit per running operation
    semaphore: Arc<Semaphore>,
    /// Configured maximum concurrency
    max: usize,
}

impl ConcurrencyLimiter {
    /// Creates a limiter allowing `max` concurrent operations
    ///
    /// A limit of zero would deadlock every caller, so it is raised to one.
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max
    }

    /// Number of slots currently held
    pub fn in_flight(&self) -> usize {
        self.max - self.semaphore.available_permits()
    }

    /// Runs one operation once a slot is free
    pub async fn run<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        // The semaphore is private to this limiter and never closed
        let Ok(_permit) = self.semaphore.acquire().await else {
            warn!("concurrency limiter closed, running operation without a slot");
            return op().await;
        };
        trace!(in_flight = self.in_flight(), max = self.max, "slot acquired");
        op().await
    }

    /// Runs every operation and joins on all of them
    ///
    /// # Arguments
    /// * `ops` - Zero-argument operations, in submission order
    ///
    /// # Returns
    /// One output per operation, in the same order as `ops`, regardless of
    /// completion order. Nothing is returned until every operation is done.
    pub async fn run_all<I, F, Fut, T>(&self, ops: I) -> Vec<T>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        join_all(ops.into_iter().map(|op| self.run(op))).await
    }
}
