//! Revocation Flow
//!
//! 1. Query every identity's allowance through the limiter
//! 2. Submit `approve(spender, 0)` for each nonzero allowance, single attempt
//! 3. Wait the settling delay
//! 4. Re-query the revoked identities and report any still approved

use ethers::types::{Address, U256};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::batch::preflight;
use crate::error::{BatchError, TaskError};
use crate::ledger::{approve_calldata, read_allowance, FailurePolicy, Ledger, TxRequest};
use crate::limiter::ConcurrencyLimiter;
use crate::report::{BatchObserver, NoopObserver};
use crate::retry::{RetryEngine, RetryPolicy};
use crate::types::{AllowanceState, GasConfig, Identity, IdentityRef, OperationKind, OperationReport};

/// Revocation submission for one identity
#[derive(Debug, Clone, Serialize)]
pub struct RevocationResult {
    pub identity: IdentityRef,
    pub report: OperationReport,
}

/// Outcome of a revocation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RevocationReport {
    /// Identities that held a nonzero allowance before revoking
    pub approved_before: Vec<AllowanceState>,
    /// One entry per revocation submitted, in identity order
    pub submissions: Vec<RevocationResult>,
    /// Identities still showing a nonzero allowance after the settling delay
    pub still_approved: Vec<AllowanceState>,
    /// Identities whose initial allowance read failed; these were not revoked
    pub query_failures: Vec<(IdentityRef, TaskError)>,
    /// Identities whose confirmation read failed
    pub recheck_failures: Vec<(IdentityRef, TaskError)>,
}

impl RevocationReport {
    pub fn revoked_count(&self) -> usize {
        self.submissions.iter().filter(|s| s.report.succeeded()).count()
    }

    /// Whether every identity that was approved is now confirmed at zero
    pub fn is_clean(&self) -> bool {
        self.still_approved.is_empty()
            && self.query_failures.is_empty()
            && self.recheck_failures.is_empty()
            && self.revoked_count() == self.submissions.len()
    }
}

/// Sets every identity's allowance for `spender` back to zero
pub struct RevocationFlow {
    ledger: Arc<dyn Ledger>,
    limiter: ConcurrencyLimiter,
    retry: RetryEngine,
    token: Address,
    spender: Address,
    gas: GasConfig,
    settle: Duration,
    observer: Arc<dyn BatchObserver>,
}

impl RevocationFlow {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        token: Address,
        spender: Address,
        gas: GasConfig,
        max_concurrency: usize,
        settle: Duration,
    ) -> Self {
        Self {
            ledger,
            limiter: ConcurrencyLimiter::new(max_concurrency),
            retry: RetryEngine::new(RetryPolicy::single_attempt(), FailurePolicy::default()),
            token,
            spender,
            gas,
            settle,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_failure_policy(mut self, failures: FailurePolicy) -> Self {
        self.retry = RetryEngine::new(self.retry.policy().clone(), failures);
        self
    }

    /// Deadline for each revocation submission; `None` waits indefinitely
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        let policy = RetryPolicy::single_attempt().with_attempt_timeout(timeout);
        self.retry = RetryEngine::new(policy, self.retry.failure_policy().clone());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs the revocation over every identity
    ///
    /// Only an unreachable endpoint fails the run; per-identity problems are
    /// recorded in the report.
    pub async fn run(&self, identities: &[Identity]) -> Result<RevocationReport, BatchError> {
        preflight(self.ledger.as_ref()).await?;
        let mut report = RevocationReport::default();

        info!("Checking allowances of {} identities", identities.len());
        let reads = self
            .limiter
            .run_all(identities.iter().map(|identity| move || self.query(identity)))
            .await;

        let mut approved = Vec::new();
        for (identity, read) in identities.iter().zip(reads) {
            match read {
                Ok(state) if state.is_authorized() => {
                    report.approved_before.push(state);
                    approved.push(identity);
                }
                Ok(_) => {}
                Err(error) => report.query_failures.push((identity.reference(), error)),
            }
        }

        if approved.is_empty() {
            info!("No identity holds an allowance, nothing to revoke");
            self.observer.revocation_finished(&report);
            return Ok(report);
        }

        info!("Revoking {} allowances", approved.len());
        report.submissions = self
            .limiter
            .run_all(approved.iter().map(|identity| move || self.revoke(identity)))
            .await;

        debug!("Waiting {:?} for revocations to settle", self.settle);
        sleep(self.settle).await;

        let rechecks = self
            .limiter
            .run_all(approved.iter().map(|identity| move || self.query(identity)))
            .await;
        for (identity, read) in approved.iter().zip(rechecks) {
            match read {
                Ok(state) if state.is_authorized() => report.still_approved.push(state),
                Ok(_) => {}
                Err(error) => report.recheck_failures.push((identity.reference(), error)),
            }
        }

        self.observer.revocation_finished(&report);
        Ok(report)
    }

    async fn query(&self, identity: &Identity) -> Result<AllowanceState, TaskError> {
        let amount = read_allowance(self.ledger.as_ref(), self.token, identity.address, self.spender)
            .await
            .map_err(|e| TaskError::AuthorizationQueryFailure(e.to_string()))?;
        Ok(AllowanceState {
            identity: identity.reference(),
            amount,
        })
    }

    async fn revoke(&self, identity: &Identity) -> RevocationResult {
        let ledger = self.ledger.as_ref();
        let token = self.token;
        let data = approve_calldata(self.spender, U256::zero());

        let outcome = self
            .retry
            .run(self.gas, move |gas, _attempt| {
                let request = TxRequest {
                    to: token,
                    data: data.clone(),
                    gas,
                    nonce: None,
                };
                ledger.submit_transaction(identity, request)
            })
            .await;

        let (tx_hash, error) = match outcome.result {
            Ok(hash) => (Some(hash), None),
            Err(error) => (None, Some(error)),
        };
        RevocationResult {
            identity: identity.reference(),
            report: OperationReport {
                kind: OperationKind::Revocation,
                nonce: None,
                attempts: outcome.attempts,
                gas_history: outcome.gas_history,
                tx_hash,
                error,
            },
        }
    }
}
