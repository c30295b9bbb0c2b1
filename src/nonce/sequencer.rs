//! Nonce Sequencer
//!
//! Reads an identity's confirmed transaction count once and hands out the
//! contiguous block `[c, c + n)`. The read happens before any of the `n`
//! submissions; if it fails nothing is submitted.

use ethers::types::Address;
use std::sync::Arc;
use tracing::debug;

use crate::error::LedgerError;
use crate::ledger::Ledger;

/// Contiguous sequence numbers reserved for one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceBlock {
    /// Confirmed transaction count at reservation time
    pub start: u64,
    pub len: u64,
}

impl NonceBlock {
    /// Sequence number of the `i`-th dependent transaction
    pub fn nth(&self, i: u64) -> Option<u64> {
        (i < self.len).then(|| self.start + i)
    }

    pub fn to_vec(&self) -> Vec<u64> {
        (self.start..self.start + self.len).collect()
    }
}

/// Assigns sequence numbers from the ledger's transaction count
#[derive(Clone)]
pub struct NonceSequencer {
    ledger: Arc<dyn Ledger>,
}

impl NonceSequencer {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Reserves `n` consecutive sequence numbers for `address`
    ///
    /// # Arguments
    /// * `address` - Identity the transactions are sent from
    /// * `n` - Number of dependent transactions
    ///
    /// # Returns
    /// The block starting at the current confirmed count, or the ledger
    /// error if the count could not be read
    pub async fn reserve(&self, address: Address, n: u64) -> Result<NonceBlock, LedgerError> {
        let start = self.ledger.transaction_count(address).await?;
        debug!("Reserved nonces {}..{} for {:?}", start, start + n, address);
        Ok(NonceBlock { start, len: n })
    }
}
