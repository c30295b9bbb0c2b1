//! Batch Summary Module
//!
//! Aggregates per-identity results once every task has finished.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::types::{IdentityRef, TaskResult};

/// Aggregate outcome of a batch
///
/// `results` keeps the order identities were submitted in.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    /// Wall time from first task scheduled to last task finished
    pub total_elapsed: Duration,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<TaskResult>,
}

impl BatchSummary {
    pub fn new(started_at: DateTime<Utc>, total_elapsed: Duration, results: Vec<TaskResult>) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        Self {
            started_at,
            total_elapsed,
            success_count,
            failure_count: results.len() - success_count,
            results,
        }
    }

    /// Per-task durations, in submission order
    pub fn durations(&self) -> Vec<(IdentityRef, Duration)> {
        self.results.iter().map(|r| (r.identity, r.elapsed)).collect()
    }

    /// Total wall time divided by the number of identities
    pub fn average_duration(&self) -> Duration {
        match u32::try_from(self.results.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_elapsed / n,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.success_count as f64 / self.results.len() as f64
    }

    /// The `n` quickest successful tasks, fastest first
    pub fn fastest(&self, n: usize) -> Vec<&TaskResult> {
        let mut successful: Vec<&TaskResult> = self.results.iter().filter(|r| r.is_success()).collect();
        successful.sort_by_key(|r| r.elapsed);
        successful.truncate(n);
        successful
    }
}
