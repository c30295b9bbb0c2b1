//! Failure Classification Module
//!
//! Decides what a ledger error means for the retry engine. Structured
//! JSON-RPC codes are checked first; message matching is the fallback for
//! endpoints that only report free text.
//!
//! # Precedence
//! 1. Transport failures and timeouts are network failures
//! 2. Configured fee error codes are fee rejections
//! 3. Sequence patterns ("nonce too low", ...) are sequence conflicts
//! 4. Fee patterns ("gas", "reverted", ...) are fee rejections
//! 5. Anything else is retried as a network failure at unchanged fees

use crate::error::{LedgerError, TaskError};

/// Configurable mapping from endpoint errors to `TaskError`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePolicy {
    fee_error_codes: Vec<i64>,
    /// Lowercased substrings marking a fee-related rejection
    fee_patterns: Vec<String>,
    /// Lowercased substrings marking a nonce collision
    sequence_patterns: Vec<String>,
}

impl FailurePolicy {
    pub fn new(fee_error_codes: Vec<i64>, fee_patterns: Vec<String>, sequence_patterns: Vec<String>) -> Self {
        Self {
            fee_error_codes,
            fee_patterns: fee_patterns.into_iter().map(|p| p.to_lowercase()).collect(),
            sequence_patterns: sequence_patterns.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn default_fee_patterns() -> Vec<String> {
        vec!["gas".into(), "reverted".into(), "underpriced".into()]
    }

    pub fn default_sequence_patterns() -> Vec<String> {
        vec![
            "nonce too low".into(),
            "already known".into(),
            "replacement transaction underpriced".into(),
        ]
    }

    /// Classifies an endpoint error
    pub fn classify(&self, err: &LedgerError) -> TaskError {
        let message = err.message();
        match err {
            LedgerError::Transport(_) | LedgerError::Timeout(_) => TaskError::NetworkFailure(message),
            LedgerError::Rpc { code, .. } if self.fee_error_codes.contains(code) => TaskError::FeeRejected(message),
            LedgerError::Rpc { .. } | LedgerError::Decode(_) => {
                let lowered = message.to_lowercase();
                if self.sequence_patterns.iter().any(|p| lowered.contains(p.as_str())) {
                    TaskError::SequenceConflict(message)
                } else if self.fee_patterns.iter().any(|p| lowered.contains(p.as_str())) {
                    TaskError::FeeRejected(message)
                } else {
                    TaskError::NetworkFailure(message)
                }
            }
        }
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::new(Vec::new(), Self::default_fee_patterns(), Self::default_sequence_patterns())
    }
}
