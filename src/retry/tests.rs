//! Tests for the retry engine

#[cfg(test)]
mod tests {
    use crate::error::{LedgerError, TaskError};
    use crate::ledger::FailurePolicy;
    use crate::retry::{RetryEngine, RetryEvent, RetryPolicy};
    use crate::types::GasConfig;
    use ethers::types::U256;
    use std::collections::VecDeque;
    use std::time::Duration;

    const GWEI: u64 = 1_000_000_000;

    fn engine(max_attempts: u32) -> RetryEngine {
        RetryEngine::new(
            RetryPolicy::new(max_attempts).with_backoff_step(Duration::from_millis(1)),
            FailurePolicy::default(),
        )
    }

    fn initial_gas() -> GasConfig {
        GasConfig::new(5 * GWEI, 300_000u64)
    }

    fn fee_error() -> LedgerError {
        LedgerError::Rpc { code: -32000, message: "transaction underpriced".into() }
    }

    /// Operation that fails with the scripted errors, then succeeds
    fn scripted(errors: Vec<LedgerError>) -> impl FnMut(GasConfig, u32) -> std::future::Ready<Result<u32, LedgerError>> {
        let mut queue: VecDeque<LedgerError> = errors.into();
        move |_gas, attempt| std::future::ready(match queue.pop_front() {
            Some(err) => Err(err),
            None => Ok(attempt),
        })
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let outcome = engine(3).run(initial_gas(), scripted(vec![])).await;
        assert_eq!(outcome.result, Ok(1));
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.gas_history, vec![initial_gas()]);
    }

    #[tokio::test]
    async fn test_fee_rejections_escalate_then_succeed() {
        let outcome = engine(3).run(initial_gas(), scripted(vec![fee_error(), fee_error()])).await;

        assert_eq!(outcome.result, Ok(3));
        assert_eq!(outcome.attempts, 3);
        let prices: Vec<U256> = outcome.gas_history.iter().map(|g| g.price).collect();
        assert_eq!(prices, vec![U256::from(5 * GWEI), U256::from(6 * GWEI), U256::from(7_200_000_000u64)]);
        let limits: Vec<U256> = outcome.gas_history.iter().map(|g| g.limit).collect();
        assert_eq!(limits, vec![U256::from(300_000u64), U256::from(450_000u64), U256::from(675_000u64)]);
    }

    #[tokio::test]
    async fn test_other_failures_keep_fees() {
        let errors = vec![
            LedgerError::Transport("connection reset".into()),
            LedgerError::Rpc { code: -32000, message: "nonce too low".into() },
        ];
        let outcome = engine(3).run(initial_gas(), scripted(errors)).await;

        assert_eq!(outcome.result, Ok(3));
        assert!(outcome.gas_history.iter().all(|g| *g == initial_gas()));
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let errors = vec![
            fee_error(),
            LedgerError::Transport("timeout".into()),
            LedgerError::Rpc { code: -32000, message: "nonce too low".into() },
        ];
        let outcome = engine(3).run(initial_gas(), scripted(errors)).await;

        assert_eq!(outcome.attempts, 3);
        assert!(matches!(outcome.result, Err(TaskError::SequenceConflict(_))));
        assert_eq!(outcome.gas_history.len(), 3);
    }

    #[tokio::test]
    async fn test_escalation_is_monotonic() {
        let outcome = engine(6).run(initial_gas(), scripted(vec![fee_error(); 10])).await;

        assert_eq!(outcome.attempts, 6);
        for pair in outcome.gas_history.windows(2) {
            assert!(pair[1].price >= pair[0].price);
            assert_eq!(pair[1].price, pair[0].price * 120 / 100);
        }
    }

    #[tokio::test]
    async fn test_attempts_never_exceed_limit() {
        for max in 1..=5 {
            let mut issued = 0u32;
            let outcome = engine(max)
                .run(initial_gas(), |_, _| {
                    issued += 1;
                    std::future::ready(Err::<(), _>(fee_error()))
                })
                .await;
            assert_eq!(outcome.attempts, max);
            assert_eq!(issued, max);
        }
    }

    #[tokio::test]
    async fn test_events_report_failures_and_escalations() {
        let mut events = Vec::new();
        let errors = vec![fee_error(), LedgerError::Transport("down".into())];
        let outcome = engine(3)
            .run_with_events(initial_gas(), scripted(errors), |event| events.push(event))
            .await;

        assert!(outcome.is_success());
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RetryEvent::AttemptFailed { attempt: 1, .. }));
        assert!(matches!(events[1], RetryEvent::Escalated { .. }));
        assert!(matches!(events[2], RetryEvent::AttemptFailed { attempt: 2, error: TaskError::NetworkFailure(_), .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_linear() {
        let engine = RetryEngine::new(RetryPolicy::new(4), FailurePolicy::default());
        let errors = vec![LedgerError::Transport("down".into()); 3];
        let outcome = engine.run(initial_gas(), scripted(errors)).await;

        // 100ms + 200ms + 300ms between the four attempts
        assert_eq!(outcome.attempts, 4);
        assert!(outcome.elapsed >= Duration::from_millis(600));
        assert!(outcome.elapsed < Duration::from_millis(650));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_network_failure() {
        let engine = RetryEngine::new(
            RetryPolicy::new(2)
                .with_backoff_step(Duration::from_millis(1))
                .with_attempt_timeout(Some(Duration::from_millis(50))),
            FailurePolicy::default(),
        );

        let outcome = engine
            .run(initial_gas(), |_, _| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<(), LedgerError>(())
            })
            .await;

        assert_eq!(outcome.attempts, 2);
        assert!(matches!(outcome.result, Err(TaskError::NetworkFailure(_))));
        // Timeouts never escalate fees
        assert!(outcome.gas_history.iter().all(|g| *g == initial_gas()));
    }

    #[test]
    fn test_policy_clamps_zero_attempts() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::new(3).backoff(2), Duration::from_millis(200));
    }
}
