// crates/resilience/tests/resilience_tests.rs
//! Integration tests for resilience patterns

use momentum_resilience::{retry_if, with_retry, RetryPolicy, RetryScheduler, Timeout};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, PartialEq)]
enum Transport {
    Busy,
    Denied,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_with_timeout() {
    let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(10));
    let timeout = Timeout::new(Duration::from_millis(100));
    let calls = AtomicUsize::new(0);
    let calls = &calls;

    let result = with_retry(&policy, || async move {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let delay = if n == 0 { 500 } else { 1 };
        timeout
            .execute(tokio::time::sleep(Duration::from_millis(delay)))
            .await
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_accumulate() {
    let policy = RetryPolicy::new(4)
        .with_initial_delay(Duration::from_secs(1))
        .with_jitter(false);
    let start = tokio::time::Instant::now();

    let result: Result<(), Transport> =
        retry_if(&policy, |e| *e == Transport::Busy, || async { Err(Transport::Busy) }).await;

    assert_eq!(result, Err(Transport::Busy));
    // 1s + 2s + 4s between four attempts
    assert_eq!(start.elapsed(), Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_permanent_error_is_not_retried() {
    let policy = RetryPolicy::new(4);
    let start = tokio::time::Instant::now();

    let result: Result<(), Transport> =
        retry_if(&policy, |e| *e == Transport::Busy, || async { Err(Transport::Denied) }).await;

    assert_eq!(result, Err(Transport::Denied));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_retry_with_policy_delay() {
    let policy = RetryPolicy::new(3)
        .with_initial_delay(Duration::from_secs(2))
        .with_jitter(false);
    let scheduler = RetryScheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let f = fired.clone();
    scheduler.schedule(policy.delay_for_attempt(2), "server busy", async move {
        f.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(scheduler.has_pending());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
