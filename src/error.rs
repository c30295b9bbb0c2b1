//! Error Types
//!
//! Errors are split by where they originate:
//! - `LedgerError`: raw failure reported by the ledger endpoint
//! - `SignatureError`: the signature service could not produce a value
//! - `TaskError`: the classified per-task error surfaced in results
//! - `BatchError`: conditions that stop a batch before or between phases

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a ledger endpoint call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Endpoint unreachable or the connection dropped
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON-RPC error response
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A configured per-attempt deadline elapsed
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint answered but the response could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),
}

impl LedgerError {
    /// Human-readable message, without the variant prefix
    pub fn message(&self) -> String {
        match self {
            LedgerError::Transport(msg) | LedgerError::Decode(msg) => msg.clone(),
            LedgerError::Rpc { message, .. } => message.clone(),
            LedgerError::Timeout(after) => format!("timed out after {:?}", after),
        }
    }
}

/// Signature service failure (SignatureFetchFailure)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature request failed: {0}")]
    Request(String),

    #[error("signature service returned status {status}")]
    Status { status: u16 },

    #[error("no signature field in response")]
    MissingField,

    #[error("signature is not valid hex: {0}")]
    InvalidHex(String),

    #[error("custom signer failed: {0}")]
    Custom(String),

    #[error("no custom signer registered under '{0}'")]
    UnknownSigner(String),
}

impl From<reqwest::Error> for SignatureError {
    fn from(err: reqwest::Error) -> Self {
        SignatureError::Request(err.to_string())
    }
}

/// Classified task error reported in `TaskResult`
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TaskError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("fee rejected: {0}")]
    FeeRejected(String),

    #[error("sequence conflict: {0}")]
    SequenceConflict(String),

    #[error("signature fetch failed: {0}")]
    SignatureFetchFailure(String),

    #[error("authorization query failed: {0}")]
    AuthorizationQueryFailure(String),
}

impl TaskError {
    /// Whether the retry engine should raise fees before the next attempt
    pub fn escalates_fee(&self) -> bool {
        matches!(self, TaskError::FeeRejected(_))
    }

    /// Errors raised before any submission; these abort the task outright
    pub fn is_pre_submission(&self) -> bool {
        matches!(
            self,
            TaskError::SignatureFetchFailure(_) | TaskError::AuthorizationQueryFailure(_)
        )
    }
}

impl From<SignatureError> for TaskError {
    fn from(err: SignatureError) -> Self {
        TaskError::SignatureFetchFailure(err.to_string())
    }
}

/// Conditions that stop a whole batch
#[derive(Debug, Error)]
pub enum BatchError {
    /// Connectivity preflight failed; nothing was scheduled
    #[error("ledger endpoint unreachable: {0}")]
    Preflight(LedgerError),

    /// Staged mode: every authorization submission failed
    #[error("none of {attempted} authorization submissions succeeded")]
    NoAuthorizations { attempted: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fee_rejection_escalates() {
        assert!(TaskError::FeeRejected("x".into()).escalates_fee());
        assert!(!TaskError::NetworkFailure("x".into()).escalates_fee());
        assert!(!TaskError::SequenceConflict("x".into()).escalates_fee());
    }

    #[test]
    fn test_signature_error_maps_to_fetch_failure() {
        let err: TaskError = SignatureError::MissingField.into();
        assert!(matches!(err, TaskError::SignatureFetchFailure(_)));
        assert!(err.is_pre_submission());
    }
}
