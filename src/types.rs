use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::TaskError;

/// One signing party participating in a batch
///
/// Created once at batch start and never mutated afterwards. The wallet is
/// the opaque signing handle handed to the ledger client on submission.
#[derive(Debug, Clone)]
pub struct Identity {
    pub index: usize,
    pub address: Address,
    signer: LocalWallet,
}

impl Identity {
    /// Wraps a wallet as the identity at `index`
    pub fn new(index: usize, signer: LocalWallet) -> Self {
        Self {
            index,
            address: signer.address(),
            signer,
        }
    }

    pub fn signer(&self) -> &LocalWallet {
        &self.signer
    }

    /// Plain-data view of this identity, safe to put in results and logs
    pub fn reference(&self) -> IdentityRef {
        IdentityRef {
            index: self.index,
            address: self.address,
        }
    }
}

/// Identity index and address without the signing handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityRef {
    pub index: usize,
    pub address: Address,
}

/// Fee parameters for one submission attempt
///
/// Escalation always produces a new value; the caller's copy is left as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConfig {
    /// Price per gas unit in wei
    pub price: U256,
    /// Maximum gas units for the transaction
    pub limit: U256,
}

impl GasConfig {
    pub fn new(price: impl Into<U256>, limit: impl Into<U256>) -> Self {
        Self {
            price: price.into(),
            limit: limit.into(),
        }
    }

    /// Returns a copy with both fields scaled by the given percentages
    ///
    /// Integer arithmetic, rounding toward zero, so `scaled(120, 150)` applied
    /// to a price of 5 gwei gives exactly 6 gwei.
    pub fn scaled(&self, price_percent: u64, limit_percent: u64) -> Self {
        Self {
            price: self.price.saturating_mul(U256::from(price_percent)) / U256::from(100u64),
            limit: self.limit.saturating_mul(U256::from(limit_percent)) / U256::from(100u64),
        }
    }
}

/// Which transaction of a task an outcome refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Authorization,
    Action,
    Revocation,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Authorization => write!(f, "authorization"),
            OperationKind::Action => write!(f, "action"),
            OperationKind::Revocation => write!(f, "revocation"),
        }
    }
}

/// Whether a task had to authorize before acting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskMode {
    /// Allowance was already nonzero; only the action was submitted
    ActionOnly,
    /// Authorization and action submitted together with consecutive nonces
    AuthorizeAndAction,
}

/// Terminal state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Success,
    /// Aborted before any submission (signature or query failure)
    Failed,
    /// Submission attempts ran out; carries the last observed error
    Exhausted,
}

/// Outcome of a single submitted operation within a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub kind: OperationKind,
    /// Pre-assigned sequence number, if one was assigned
    pub nonce: Option<u64>,
    /// Submission attempts actually issued
    pub attempts: u32,
    /// Fee parameters used by each attempt, in order
    pub gas_history: Vec<GasConfig>,
    pub tx_hash: Option<H256>,
    pub error: Option<TaskError>,
}

impl OperationReport {
    pub fn succeeded(&self) -> bool {
        self.tx_hash.is_some()
    }
}

/// Per-identity result of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub identity: IdentityRef,
    pub status: TaskStatus,
    pub mode: Option<TaskMode>,
    pub authorization_tx: Option<H256>,
    pub action_tx: Option<H256>,
    pub error: Option<TaskError>,
    /// Operation that caused the failure, when a submission failed
    pub failed_operation: Option<OperationKind>,
    /// Largest attempt count among the task's submitted operations
    pub attempts: u32,
    pub elapsed: Duration,
    pub operations: Vec<OperationReport>,
}

impl TaskResult {
    /// Result for a task that failed before submitting anything
    pub fn aborted(identity: IdentityRef, mode: Option<TaskMode>, error: TaskError, elapsed: Duration) -> Self {
        Self {
            identity,
            status: TaskStatus::Failed,
            mode,
            authorization_tx: None,
            action_tx: None,
            error: Some(error),
            failed_operation: None,
            attempts: 0,
            elapsed,
            operations: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// Hashes of every transaction this task got accepted
    pub fn tx_hashes(&self) -> Vec<H256> {
        self.authorization_tx.iter().chain(self.action_tx.iter()).copied().collect()
    }
}

/// Allowance read for one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceState {
    pub identity: IdentityRef,
    pub amount: U256,
}

impl AllowanceState {
    pub fn is_authorized(&self) -> bool {
        !self.amount.is_zero()
    }
}
