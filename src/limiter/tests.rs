//! Tests for the concurrency limiter

#[cfg(test)]
mod tests {
    use crate::limiter::ConcurrencyLimiter;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks current and peak number of concurrently running operations
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        for (limit, tasks) in [(1usize, 5usize), (3, 10), (4, 4), (5, 40)] {
            let limiter = ConcurrencyLimiter::new(limit);
            let gauge = Arc::new(Gauge::default());

            let ops = (0..tasks).map(|i| {
                let gauge = gauge.clone();
                move || async move {
                    gauge.enter();
                    tokio::time::sleep(Duration::from_millis(2 + (i % 3) as u64)).await;
                    gauge.exit();
                    i
                }
            });

            let results = limiter.run_all(ops).await;
            assert_eq!(results.len(), tasks);
            assert!(gauge.peak.load(Ordering::SeqCst) <= limit);
            assert_eq!(limiter.in_flight(), 0);
        }
    }

    #[tokio::test]
    async fn test_saturates_available_slots() {
        let limiter = ConcurrencyLimiter::new(3);
        let gauge = Arc::new(Gauge::default());

        let ops = (0..9).map(|_| {
            let gauge = gauge.clone();
            move || async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(20)).await;
                gauge.exit();
            }
        });
        limiter.run_all(ops).await;

        assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let limiter = ConcurrencyLimiter::new(4);

        // Earlier operations sleep longer, so they finish last
        let ops = (0..8u64).map(|i| {
            move || async move {
                tokio::time::sleep(Duration::from_millis(5 * (8 - i))).await;
                i
            }
        });

        let results = limiter.run_all(ops).await;
        assert_eq!(results, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_queued_operations_start_in_submission_order() {
        let limiter = ConcurrencyLimiter::new(1);
        let started = Arc::new(std::sync::Mutex::new(Vec::new()));

        let ops = (0..5).map(|i| {
            let started = started.clone();
            move || async move {
                if let Ok(mut order) = started.lock() {
                    order.push(i);
                }
                tokio::task::yield_now().await;
            }
        });
        limiter.run_all(ops).await;

        let order = started.lock().map(|o| o.clone()).unwrap_or_default();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failures_are_returned_not_raised() {
        let limiter = ConcurrencyLimiter::new(2);
        let ops = (0..4).map(|i| {
            move || async move {
                if i % 2 == 0 { Ok(i) } else { Err(format!("op {} failed", i)) }
            }
        });

        let results: Vec<Result<i32, String>> = limiter.run_all(ops).await;
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[1], Err("op 1 failed".to_string()));
        assert_eq!(results[3], Err("op 3 failed".to_string()));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let limiter = ConcurrencyLimiter::new(3);
        let ops: Vec<fn() -> std::future::Ready<u8>> = Vec::new();
        assert!(limiter.run_all(ops).await.is_empty());
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.max_concurrency(), 1);
    }
}
