//! Batch Executor Module
//!
//! Top-level driver that runs one task per identity through the shared
//! concurrency limiter and aggregates the results.
//!
//! # Task Flow (pipelined mode)
//! 1. Read the identity's allowance for the target contract
//! 2. Zero allowance: reserve two consecutive nonces (authorize + action)
//! 3. Build the action payload, composing in a signature if a provider is set
//! 4. Submit (authorization and action concurrently when both are needed),
//!    each through the retry engine
//! 5. Record a `TaskResult`
//!
//! Query and signature failures abort the task before anything is sent.
//! No task failure ever stops the batch; only the connectivity preflight can.

use chrono::Utc;
use ethers::types::{Address, Bytes, U256};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::summary::BatchSummary;
use crate::calldata::{compose, SignaturePosition};
use crate::error::{BatchError, TaskError};
use crate::ledger::{approve_calldata, read_allowance, Ledger, TxRequest};
use crate::limiter::ConcurrencyLimiter;
use crate::nonce::NonceSequencer;
use crate::report::{BatchObserver, NoopObserver};
use crate::retry::{RetryEngine, RetryEvent, RetryPolicy};
use crate::signature::{SignatureParams, SignatureProvider};
use crate::types::{GasConfig, Identity, OperationKind, OperationReport, TaskMode, TaskResult, TaskStatus};

/// How authorization and action are scheduled across the batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Each task authorizes (if needed) and acts in one go
    #[default]
    Pipelined,
    /// All authorizations first, then all actions
    Staged,
}

/// Inputs shared by every task of a batch
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Fungible asset contract the identities authorize
    pub token: Address,
    /// Contract receiving the action (and the authorization)
    pub target: Address,
    /// Base action payload
    pub payload: Bytes,
    /// Initial fee parameters for every task
    pub gas: GasConfig,
    pub max_concurrency: usize,
    pub mode: ExecutionMode,
    pub signature_position: SignaturePosition,
    pub signature_params: SignatureParams,
}

/// Checks the ledger endpoint is reachable before scheduling anything
pub async fn preflight(ledger: &dyn Ledger) -> Result<u64, BatchError> {
    let block = ledger.block_number().await.map_err(BatchError::Preflight)?;
    info!("Connected to ledger, current block {}", block);
    Ok(block)
}

/// Phase-1 outcome for one identity in staged mode
enum StagedAuthorization {
    AlreadyAuthorized,
    Submitted(OperationReport),
    QueryFailed(TaskError),
}

/// Batch executor
///
/// Owns the shared limiter and retry engine; identities are borrowed for
/// the duration of `execute`.
pub struct BatchExecutor {
    ledger: Arc<dyn Ledger>,
    limiter: ConcurrencyLimiter,
    retry: RetryEngine,
    nonces: NonceSequencer,
    signatures: Option<Arc<dyn SignatureProvider>>,
    observer: Arc<dyn BatchObserver>,
    config: ExecutorConfig,
}

impl BatchExecutor {
    /// Creates a new executor
    ///
    /// # Arguments
    /// * `ledger` - Endpoint used for reads and submissions
    /// * `config` - Batch-wide inputs (contracts, payload, fees, concurrency)
    /// * `retry` - Engine applied to action (and pipelined authorization) submissions
    pub fn new(ledger: Arc<dyn Ledger>, config: ExecutorConfig, retry: RetryEngine) -> Self {
        Self {
            limiter: ConcurrencyLimiter::new(config.max_concurrency),
            nonces: NonceSequencer::new(ledger.clone()),
            ledger,
            retry,
            signatures: None,
            observer: Arc::new(NoopObserver),
            config,
        }
    }

    pub fn with_signature_provider(mut self, provider: Arc<dyn SignatureProvider>) -> Self {
        self.signatures = Some(provider);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs the batch over every identity
    ///
    /// # Returns
    /// * `Ok(BatchSummary)` with exactly one result per identity, in input order
    /// * `Err(BatchError::Preflight)` if the endpoint is unreachable
    /// * `Err(BatchError::NoAuthorizations)` in staged mode when no identity
    ///   ends up authorized
    pub async fn execute(&self, identities: &[Identity]) -> Result<BatchSummary, BatchError> {
        preflight(self.ledger.as_ref()).await?;

        info!(
            "Batch starting: {} identities, max concurrency {}, mode {:?}, signature {}",
            identities.len(),
            self.limiter.max_concurrency(),
            self.config.mode,
            self.signatures.as_ref().map(|p| p.name()).unwrap_or("none")
        );

        let started_at = Utc::now();
        let started = Instant::now();

        let results = match self.config.mode {
            ExecutionMode::Pipelined => {
                self.limiter
                    .run_all(identities.iter().map(|identity| move || self.run_task(identity)))
                    .await
            }
            ExecutionMode::Staged => self.run_staged(identities).await?,
        };

        let summary = BatchSummary::new(started_at, started.elapsed(), results);
        self.observer.batch_finished(&summary);
        Ok(summary)
    }

    /// Pipelined task for one identity
    async fn run_task(&self, identity: &Identity) -> TaskResult {
        let started = Instant::now();
        let who = identity.reference();
        self.observer.task_started(&who);

        // Step 1: decide between one- and two-operation mode
        let allowance = match read_allowance(
            self.ledger.as_ref(),
            self.config.token,
            identity.address,
            self.config.target,
        )
        .await
        {
            Ok(amount) => amount,
            Err(e) => {
                let error = TaskError::AuthorizationQueryFailure(e.to_string());
                return self.finish(TaskResult::aborted(who, None, error, started.elapsed()));
            }
        };
        let mode = if allowance.is_zero() {
            TaskMode::AuthorizeAndAction
        } else {
            TaskMode::ActionOnly
        };

        // Step 2: both nonces are fixed before either submission is issued
        let nonces = match mode {
            TaskMode::ActionOnly => None,
            TaskMode::AuthorizeAndAction => match self.nonces.reserve(identity.address, 2).await {
                Ok(block) => Some(block),
                Err(e) => {
                    let error = TaskError::AuthorizationQueryFailure(e.to_string());
                    return self.finish(TaskResult::aborted(who, Some(mode), error, started.elapsed()));
                }
            },
        };

        // Step 3: signature failures abort without consuming attempts
        let payload = match self.action_payload(identity.address).await {
            Ok(payload) => payload,
            Err(error) => return self.finish(TaskResult::aborted(who, Some(mode), error, started.elapsed())),
        };

        // Step 4: submit
        let operations = match nonces {
            None => vec![self.submit_action(identity, payload, None).await],
            Some(block) => {
                let (authorization, action) = tokio::join!(
                    self.submit(
                        identity,
                        OperationKind::Authorization,
                        self.config.token,
                        approve_calldata(self.config.target, U256::MAX),
                        block.nth(0),
                        &self.retry,
                    ),
                    self.submit_action(identity, payload, block.nth(1)),
                );
                vec![authorization, action]
            }
        };

        self.finish(assemble(identity, mode, operations, started.elapsed()))
    }

    /// Staged mode: authorize everyone, then act for everyone authorized
    async fn run_staged(&self, identities: &[Identity]) -> Result<Vec<TaskResult>, BatchError> {
        let phase_started = Instant::now();
        info!("Staged mode: authorizing {} identities", identities.len());

        let authorizations = self
            .limiter
            .run_all(identities.iter().map(|identity| move || self.authorize_staged(identity)))
            .await;
        let phase_elapsed = phase_started.elapsed();

        let attempted = authorizations
            .iter()
            .filter(|a| matches!(a, StagedAuthorization::Submitted(_)))
            .count();
        let authorized = authorizations
            .iter()
            .filter(|a| match a {
                StagedAuthorization::AlreadyAuthorized => true,
                StagedAuthorization::Submitted(report) => report.succeeded(),
                StagedAuthorization::QueryFailed(_) => false,
            })
            .count();
        info!("Authorization phase: {}/{} identities authorized", authorized, identities.len());

        if authorized == 0 && !identities.is_empty() {
            return Err(BatchError::NoAuthorizations { attempted });
        }

        let results = self
            .limiter
            .run_all(
                identities
                    .iter()
                    .zip(authorizations)
                    .map(|(identity, authorization)| move || self.act_staged(identity, authorization, phase_elapsed)),
            )
            .await;
        Ok(results)
    }

    async fn authorize_staged(&self, identity: &Identity) -> StagedAuthorization {
        let allowance = read_allowance(
            self.ledger.as_ref(),
            self.config.token,
            identity.address,
            self.config.target,
        )
        .await;

        match allowance {
            Err(e) => StagedAuthorization::QueryFailed(TaskError::AuthorizationQueryFailure(e.to_string())),
            Ok(amount) if !amount.is_zero() => StagedAuthorization::AlreadyAuthorized,
            Ok(_) => {
                let policy = RetryPolicy::single_attempt().with_attempt_timeout(self.retry.policy().attempt_timeout);
                let single = RetryEngine::new(policy, self.retry.failure_policy().clone());
                let report = self
                    .submit(
                        identity,
                        OperationKind::Authorization,
                        self.config.token,
                        approve_calldata(self.config.target, U256::MAX),
                        None,
                        &single,
                    )
                    .await;
                StagedAuthorization::Submitted(report)
            }
        }
    }

    async fn act_staged(
        &self,
        identity: &Identity,
        authorization: StagedAuthorization,
        phase_elapsed: std::time::Duration,
    ) -> TaskResult {
        let started = Instant::now();
        let who = identity.reference();
        self.observer.task_started(&who);

        let (mode, mut operations) = match authorization {
            StagedAuthorization::QueryFailed(error) => {
                return self.finish(TaskResult::aborted(who, None, error, phase_elapsed));
            }
            StagedAuthorization::Submitted(report) if !report.succeeded() => {
                let mode = TaskMode::AuthorizeAndAction;
                return self.finish(assemble(identity, mode, vec![report], phase_elapsed));
            }
            StagedAuthorization::Submitted(report) => (TaskMode::AuthorizeAndAction, vec![report]),
            StagedAuthorization::AlreadyAuthorized => (TaskMode::ActionOnly, Vec::new()),
        };

        let payload = match self.action_payload(identity.address).await {
            Ok(payload) => payload,
            Err(error) => {
                let mut result = TaskResult::aborted(who, Some(mode), error, phase_elapsed + started.elapsed());
                result.authorization_tx = operations.first().and_then(|op| op.tx_hash);
                result.attempts = operations.iter().map(|op| op.attempts).max().unwrap_or(0);
                result.operations = operations;
                return self.finish(result);
            }
        };

        operations.push(self.submit_action(identity, payload, None).await);
        self.finish(assemble(identity, mode, operations, phase_elapsed + started.elapsed()))
    }

    /// Base payload, with the provider's signature composed in
    async fn action_payload(&self, address: Address) -> Result<Bytes, TaskError> {
        let Some(provider) = &self.signatures else {
            return Ok(self.config.payload.clone());
        };

        let signature = provider.get_signature(address, &self.config.signature_params).await?;
        debug!("Fetched {}-byte signature for {:?}", signature.len(), address);
        Ok(compose(&self.config.payload, &signature, self.config.signature_position))
    }

    async fn submit_action(&self, identity: &Identity, payload: Bytes, nonce: Option<u64>) -> OperationReport {
        self.submit(identity, OperationKind::Action, self.config.target, payload, nonce, &self.retry)
            .await
    }

    /// Submits one transaction through a retry engine
    async fn submit(
        &self,
        identity: &Identity,
        kind: OperationKind,
        to: Address,
        data: Bytes,
        nonce: Option<u64>,
        retry: &RetryEngine,
    ) -> OperationReport {
        let who = identity.reference();
        let observer = &self.observer;
        let ledger = self.ledger.as_ref();

        let outcome = retry
            .run_with_events(
                self.config.gas,
                move |gas, _attempt| {
                    let request = TxRequest {
                        to,
                        data: data.clone(),
                        gas,
                        nonce,
                    };
                    ledger.submit_transaction(identity, request)
                },
                |event| match event {
                    RetryEvent::AttemptFailed { attempt, gas, error } => {
                        observer.attempt_failed(&who, kind, attempt, &gas, &error)
                    }
                    RetryEvent::Escalated { from, to } => observer.fee_escalated(&who, kind, &from, &to),
                },
            )
            .await;

        if let Err(error) = &outcome.result {
            warn!("Identity {} {} gave up after {} attempts: {}", who.index, kind, outcome.attempts, error);
        }

        let (tx_hash, error) = match outcome.result {
            Ok(hash) => (Some(hash), None),
            Err(error) => (None, Some(error)),
        };
        OperationReport {
            kind,
            nonce,
            attempts: outcome.attempts,
            gas_history: outcome.gas_history,
            tx_hash,
            error,
        }
    }

    fn finish(&self, result: TaskResult) -> TaskResult {
        self.observer.task_finished(&result);
        result
    }
}

/// Builds a task result from its submitted operations
///
/// The first failed operation (authorization before action) decides the
/// reported error.
fn assemble(
    identity: &Identity,
    mode: TaskMode,
    operations: Vec<OperationReport>,
    elapsed: std::time::Duration,
) -> TaskResult {
    let failed = operations.iter().find(|op| !op.succeeded());
    let tx_of = |kind: OperationKind| {
        operations
            .iter()
            .find(|op| op.kind == kind)
            .and_then(|op| op.tx_hash)
    };

    TaskResult {
        identity: identity.reference(),
        status: if failed.is_some() {
            TaskStatus::Exhausted
        } else {
            TaskStatus::Success
        },
        mode: Some(mode),
        authorization_tx: tx_of(OperationKind::Authorization),
        action_tx: tx_of(OperationKind::Action),
        error: failed.and_then(|op| op.error.clone()),
        failed_operation: failed.map(|op| op.kind),
        attempts: operations.iter().map(|op| op.attempts).max().unwrap_or(0),
        elapsed,
        operations,
    }
}
