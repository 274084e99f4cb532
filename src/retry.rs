use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RetryExhausted;

/// Attempt bound and backoff base for one wrapped call. Ephemeral value
/// object; construct per call site, nothing is persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is clamped to 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff inserted after failed attempt `attempt` (zero-based):
    /// `base * 2^attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// One exhausted operation, recorded when its final attempt fails.
/// Intermediate failed attempts leave no entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub error: String,
    pub attempts: u32,
}

#[derive(Debug, Default)]
struct FailureLog {
    entries: Vec<FailureEntry>,
    exhausted_ops: u64,
}

/// Bounded-retry wrapper with exponential backoff and per-run failure
/// telemetry. Clone freely; clones share one failure log, and each suite run
/// owns its own executor so runs never see each other's telemetry.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    log: Arc<Mutex<FailureLog>>,
}

impl RetryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` up to `policy.max_attempts()` times, sleeping
    /// `base * 2^i` after failed attempt `i`. Never sleeps after the final
    /// attempt. On exhaustion, records one failure entry and returns the last
    /// error wrapped in [`RetryExhausted`].
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: &str,
        policy: &RetryPolicy,
        mut action: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            match action().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= policy.max_attempts() {
                        self.record(FailureEntry {
                            timestamp: Utc::now(),
                            operation: operation.to_string(),
                            error: err.to_string(),
                            attempts: attempt,
                        });
                        return Err(RetryExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            source: err,
                        });
                    }

                    let delay = policy.delay_after(attempt - 1);
                    log::debug!(
                        "'{}' failed on attempt {}/{}, backing off {:?}: {}",
                        operation,
                        attempt,
                        policy.max_attempts(),
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn record(&self, entry: FailureEntry) {
        if let Ok(mut log) = self.log.lock() {
            log.entries.push(entry);
            log.exhausted_ops += 1;
        }
    }

    /// Snapshot of recorded failures, in recording order.
    pub fn failure_entries(&self) -> Vec<FailureEntry> {
        self.log
            .lock()
            .map(|log| log.entries.clone())
            .unwrap_or_default()
    }

    /// Number of operations that ran out of attempts.
    pub fn exhausted_count(&self) -> u64 {
        self.log.lock().map(|log| log.exhausted_ops).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use thiserror::Error;
    use tokio::time::Instant;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[tokio::test]
    async fn test_success_after_failures_leaves_no_entries() {
        let executor = RetryExecutor::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let value = executor
            .execute("flaky", &policy, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Boom)
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(executor.failure_entries().is_empty());
        assert_eq!(executor.exhausted_count(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_records_exactly_one_entry() {
        let executor = RetryExecutor::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let err = executor
            .execute("hopeless", &policy, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Boom)
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.operation, "hopeless");
        assert_eq!(err.attempts, 3);

        let entries = executor.failure_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, "hopeless");
        assert_eq!(entries[0].error, "boom");
        assert_eq!(entries[0].attempts, 3);
        assert_eq!(executor.exhausted_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_attempts() {
        let executor = RetryExecutor::new();
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        let gaps = Mutex::new(Vec::new());
        let last_call = Mutex::new(None::<Instant>);

        let _ = executor
            .execute("timed", &policy, || async {
                let now = Instant::now();
                let mut last = last_call.lock().unwrap();
                if let Some(prev) = *last {
                    gaps.lock().unwrap().push(now - prev);
                }
                *last = Some(now);
                Err::<(), _>(Boom)
            })
            .await;

        let gaps = gaps.lock().unwrap().clone();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
        assert!(gaps[0] < gaps[1] && gaps[1] < gaps[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sleep_after_final_attempt() {
        let executor = RetryExecutor::new();
        let policy = RetryPolicy::new(2, Duration::from_secs(60));
        let started = Instant::now();

        let _ = executor
            .execute("last", &policy, || async { Err::<(), _>(Boom) })
            .await;

        // One backoff between the two attempts, none after the second.
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_zero_attempts_clamps_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);

        let executor = RetryExecutor::new();
        let calls = AtomicU32::new(0);
        let _ = executor
            .execute("clamped", &policy, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Boom)
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
