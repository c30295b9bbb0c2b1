//! Concurrency Limiting Module
//!
//! Bounded-parallelism gate every batch component runs its work through.
//! At most `K` operations run at once; the rest wait in submission order.

mod limiter;

#[cfg(test)]
mod tests;

pub use limiter::ConcurrencyLimiter;
