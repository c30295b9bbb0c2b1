//! Batch Execution Module
//!
//! This module runs one task per identity and aggregates the outcome:
//! - BatchExecutor: schedules tasks through the concurrency limiter
//! - BatchSummary: per-batch counts, durations and results

mod executor;
mod summary;


pub use executor::{preflight, BatchExecutor, ExecutionMode, ExecutorConfig};
pub use summary::BatchSummary;
