use tracing::{info, warn};

use crate::batch::BatchSummary;
use crate::error::TaskError;
use crate::revoke::RevocationReport;
use crate::types::{GasConfig, IdentityRef, OperationKind, TaskResult};

/// Receives progress events from batch and revocation runs
///
/// Every hook defaults to doing nothing. Hooks are called from task
/// context and must not block.
pub trait BatchObserver: Send + Sync {
    fn task_started(&self, _identity: &IdentityRef) {}

    fn attempt_failed(
        &self,
        _identity: &IdentityRef,
        _operation: OperationKind,
        _attempt: u32,
        _gas: &GasConfig,
        _error: &TaskError,
    ) {
    }

    fn fee_escalated(&self, _identity: &IdentityRef, _operation: OperationKind, _from: &GasConfig, _to: &GasConfig) {}

    fn task_finished(&self, _result: &TaskResult) {}

    fn batch_finished(&self, _summary: &BatchSummary) {}

    fn revocation_finished(&self, _report: &RevocationReport) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Observer that logs through `tracing`
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    /// How many of the fastest successful tasks to list at the end
    pub fastest: usize,
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self { fastest: 5 }
    }
}

impl BatchObserver for TracingObserver {
    fn task_started(&self, identity: &IdentityRef) {
        info!("-> identity {} ({:?}) starting", identity.index, identity.address);
    }

    fn attempt_failed(
        &self,
        identity: &IdentityRef,
        operation: OperationKind,
        attempt: u32,
        _gas: &GasConfig,
        error: &TaskError,
    ) {
        warn!("identity {} {} attempt {} failed: {}", identity.index, operation, attempt, error);
    }

    fn fee_escalated(&self, identity: &IdentityRef, operation: OperationKind, _from: &GasConfig, to: &GasConfig) {
        info!(
            "identity {} {} raising gas - price: {} wei, limit: {}",
            identity.index, operation, to.price, to.limit
        );
    }

    fn task_finished(&self, result: &TaskResult) {
        let ms = result.elapsed.as_millis();
        if result.is_success() {
            match (result.authorization_tx, result.action_tx) {
                (Some(auth), Some(action)) => info!(
                    "✓ identity {} succeeded ({}ms): authorization={:?} action={:?}",
                    result.identity.index, ms, auth, action
                ),
                (_, Some(action)) => info!(
                    "✓ identity {} succeeded ({}ms, {} attempts): {:?}",
                    result.identity.index, ms, result.attempts, action
                ),
                _ => info!("✓ identity {} succeeded ({}ms)", result.identity.index, ms),
            }
        } else {
            let reason = result.error.as_ref().map(ToString::to_string).unwrap_or_default();
            match result.failed_operation {
                Some(op) => warn!("✗ identity {} {} failed ({}ms): {}", result.identity.index, op, ms, reason),
                None => warn!("✗ identity {} failed ({}ms): {}", result.identity.index, ms, reason),
            }
        }
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        info!("Batch finished: {} succeeded, {} failed", summary.success_count, summary.failure_count);
        info!(
            "Total {}ms, average {}ms per identity, success rate {:.2}%",
            summary.total_elapsed.as_millis(),
            summary.average_duration().as_millis(),
            summary.success_rate() * 100.0
        );
        for (rank, result) in summary.fastest(self.fastest).iter().enumerate() {
            info!("  {}. identity {} - {}ms", rank + 1, result.identity.index, result.elapsed.as_millis());
        }
    }

    fn revocation_finished(&self, report: &RevocationReport) {
        info!(
            "Revocation: {} approved before, {} revoked, {} failed",
            report.approved_before.len(),
            report.revoked_count(),
            report.submissions.len() - report.revoked_count()
        );
        if report.still_approved.is_empty() {
            info!("✓ all identities revoked");
        } else {
            warn!("{} identities still approved", report.still_approved.len());
        }
    }
}
