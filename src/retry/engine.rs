//! Retry Engine
//!
//! Drives one submission operation through the retry state machine and
//! reports what happened as plain data.
//!
//! # Transitions
//! - `Init` -> `Attempting(1)`
//! - `Attempting(k)` success -> `Success(k)`
//! - `Attempting(k)` failure with `k == max` -> `Exhausted(k)`
//! - `Attempting(k)` fee rejection -> `Escalating(k)` -> `Attempting(k + 1)`
//! - `Attempting(k)` other failure -> `Attempting(k + 1)` at the same fees

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use super::policy::RetryPolicy;
use crate::error::{LedgerError, TaskError};
use crate::ledger::FailurePolicy;
use crate::types::GasConfig;

/// State of a task's submission loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Init,
    Attempting { attempt: u32 },
    Escalating { attempt: u32 },
    Success { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Progress notifications emitted while retrying
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    AttemptFailed { attempt: u32, gas: GasConfig, error: TaskError },
    Escalated { from: GasConfig, to: GasConfig },
}

/// Result of running an operation through the engine
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    /// Value of the successful attempt, or the last classified error
    pub result: Result<T, TaskError>,
    /// Attempts actually issued
    pub attempts: u32,
    /// Fee parameters of each issued attempt, in order
    pub gas_history: Vec<GasConfig>,
    pub elapsed: Duration,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Fee parameters of the last issued attempt
    pub fn final_gas(&self) -> Option<GasConfig> {
        self.gas_history.last().copied()
    }
}

/// Runs submissions with classification, escalation and linear backoff
#[derive(Debug, Clone)]
pub struct RetryEngine {
    policy: RetryPolicy,
    failures: FailurePolicy,
}

impl RetryEngine {
    pub fn new(policy: RetryPolicy, failures: FailurePolicy) -> Self {
        Self { policy, failures }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn failure_policy(&self) -> &FailurePolicy {
        &self.failures
    }

    /// Runs `op` until it succeeds or attempts run out
    ///
    /// # Arguments
    /// * `initial` - Fee parameters of the first attempt; never modified
    /// * `op` - Called with the attempt's fee parameters and 1-based attempt number
    pub async fn run<T, F, Fut>(&self, initial: GasConfig, op: F) -> RetryOutcome<T>
    where
        F: FnMut(GasConfig, u32) -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        self.run_with_events(initial, op, |_| {}).await
    }

    /// Same as `run`, reporting failures and escalations to `on_event`
    pub async fn run_with_events<T, F, Fut, E>(&self, initial: GasConfig, mut op: F, mut on_event: E) -> RetryOutcome<T>
    where
        F: FnMut(GasConfig, u32) -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
        E: FnMut(RetryEvent),
    {
        let started = Instant::now();
        let mut gas = initial;
        let mut gas_history = Vec::new();
        let mut value = None;
        let mut last_error = None;
        let mut state = RetryState::Init;

        loop {
            state = match state {
                RetryState::Init => RetryState::Attempting { attempt: 1 },

                RetryState::Attempting { attempt } => {
                    if attempt > 1 {
                        sleep(self.policy.backoff(attempt - 1)).await;
                    }

                    gas_history.push(gas);
                    match self.attempt(&mut op, gas, attempt).await {
                        Ok(v) => {
                            value = Some(v);
                            RetryState::Success { attempts: attempt }
                        }
                        Err(err) => {
                            let classified = self.failures.classify(&err);
                            warn!("Attempt {}/{} failed: {}", attempt, self.policy.max_attempts, classified);
                            on_event(RetryEvent::AttemptFailed {
                                attempt,
                                gas,
                                error: classified.clone(),
                            });

                            let escalate = classified.escalates_fee();
                            last_error = Some(classified);
                            if attempt >= self.policy.max_attempts {
                                RetryState::Exhausted { attempts: attempt }
                            } else if escalate {
                                RetryState::Escalating { attempt }
                            } else {
                                RetryState::Attempting { attempt: attempt + 1 }
                            }
                        }
                    }
                }

                RetryState::Escalating { attempt } => {
                    let next = gas.scaled(self.policy.price_percent, self.policy.limit_percent);
                    debug!("Escalating gas price {} -> {}, limit {} -> {}", gas.price, next.price, gas.limit, next.limit);
                    on_event(RetryEvent::Escalated { from: gas, to: next });
                    gas = next;
                    RetryState::Attempting { attempt: attempt + 1 }
                }

                RetryState::Success { attempts } => {
                    let result = value
                        .take()
                        .ok_or_else(|| TaskError::NetworkFailure("attempt value missing".into()));
                    return RetryOutcome {
                        result,
                        attempts,
                        gas_history,
                        elapsed: started.elapsed(),
                    };
                }

                RetryState::Exhausted { attempts } => {
                    let error = last_error
                        .take()
                        .unwrap_or_else(|| TaskError::NetworkFailure("retries exhausted".into()));
                    return RetryOutcome {
                        result: Err(error),
                        attempts,
                        gas_history,
                        elapsed: started.elapsed(),
                    };
                }
            };
        }
    }

    /// Issues one attempt, applying the per-attempt deadline if configured
    async fn attempt<T, F, Fut>(&self, op: &mut F, gas: GasConfig, attempt: u32) -> Result<T, LedgerError>
    where
        F: FnMut(GasConfig, u32) -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        match self.policy.attempt_timeout {
            Some(limit) => match timeout(limit, op(gas, attempt)).await {
                Ok(result) => result,
                Err(_) => Err(LedgerError::Timeout(limit)),
            },
            None => op(gas, attempt).await,
        }
    }
}
