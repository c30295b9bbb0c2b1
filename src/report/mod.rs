//! Reporting Module
//!
//! The engine never prints. It hands structured events to a
//! `BatchObserver`; `TracingObserver` turns them into log lines.

mod observer;

pub use observer::{BatchObserver, NoopObserver, TracingObserver};
