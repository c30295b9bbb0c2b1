//! This crate batches authorize-then-act transaction pairs across many signing
//! identities against a remote ledger endpoint, under bounded concurrency, with
//! per-identity retry, fee escalation and optional signature augmentation.

pub mod types; // Identities, fee parameters and per-task results.
pub mod error; // Ledger, signature, task and batch error types.
pub mod limiter; // Bounded-parallelism gate shared by every stage.
pub mod ledger; // Ledger endpoint client, ERC-20 encoding and failure classification.
pub mod nonce; // Pre-assigned sequence numbers for dependent transactions.
pub mod retry; // Per-operation retry state machine with fee escalation.
pub mod signature; // Signature providers composed into the action payload.
pub mod calldata; // Payload composition and ABI parameter patching.
pub mod identity; // Mnemonic-based identity derivation.
pub mod report; // Observer hooks for progress reporting.
pub mod batch; // Batch executor and summary.
pub mod revoke; // Allowance revocation flow.
pub mod config; // Defines and loads run configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use batch::{BatchExecutor, BatchSummary};
pub use revoke::{RevocationFlow, RevocationReport};
