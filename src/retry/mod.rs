//! Retry Module
//!
//! Per-task submission state machine:
//! `Init -> Attempting -> {Success, Escalating, Exhausted}`.
//! Fee rejections raise gas price and limit before the next attempt; other
//! failures retry at unchanged fees. Attempts are separated by a linear
//! backoff.

mod engine;
mod policy;

#[cfg(test)]
mod tests;

pub use engine::{RetryEngine, RetryEvent, RetryOutcome, RetryState};
pub use policy::RetryPolicy;
