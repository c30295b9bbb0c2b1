//! Nonce Sequencing Module
//!
//! Pre-assigns sequence numbers to dependent transactions of one identity
//! so they can be submitted together without waiting for confirmations.

mod sequencer;

pub use sequencer::{NonceBlock, NonceSequencer};
