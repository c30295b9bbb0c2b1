//! Ledger Integration Module
//!
//! This module handles everything that talks to the remote ledger endpoint:
//! - `Ledger`: the request/response surface the batch engine consumes
//! - `EthersLedger`: JSON-RPC implementation that signs locally
//! - ERC-20 allowance/approve encoding
//! - `FailurePolicy`: turns endpoint errors into classified task errors

mod classify;
mod client;
mod erc20;

#[cfg(test)]
pub(crate) mod mock;

pub use classify::FailurePolicy;
pub use client::{EthersLedger, Ledger, TxRequest};
pub use erc20::{allowance_calldata, approve_calldata, read_allowance};
