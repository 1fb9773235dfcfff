// crates/resilience/src/scheduler.rs
//! Delayed retries behind a cancellable handle

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A retry waiting to fire
#[derive(Debug)]
pub struct PendingRetry {
    handle: JoinHandle<()>,
    fires_at: Instant,
    reason: String,
}

impl PendingRetry {
    /// Aborts the retry if it has not fired yet
    pub fn cancel(self) {
        self.handle.abort();
    }

    /// Time left before the retry fires
    pub fn remaining(&self) -> Duration {
        self.fires_at.saturating_duration_since(Instant::now())
    }

    /// Why the retry was scheduled
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns true once the retry has run or been aborted
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Holds at most one pending retry
///
/// Scheduling a new retry cancels the previous one, so retries never stack.
#[derive(Debug, Default)]
pub struct RetryScheduler {
    pending: Mutex<Option<PendingRetry>>,
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` after `delay` on the current tokio runtime
    pub fn schedule<F>(&self, delay: Duration, reason: impl Into<String>, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let reason = reason.into();
        log::info!("Scheduling retry in {:?}: {}", delay, reason);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });
        let retry = PendingRetry {
            handle,
            fires_at: Instant::now() + delay,
            reason,
        };

        match self.pending.lock() {
            Ok(mut pending) => {
                if let Some(previous) = pending.replace(retry) {
                    log::debug!("Replacing pending retry: {}", previous.reason());
                    previous.cancel();
                }
            }
            Err(_) => {
                log::error!("Retry scheduler lock poisoned, dropping retry");
                retry.cancel();
            }
        }
    }

    /// Cancels the pending retry, returning whether one was waiting
    pub fn cancel(&self) -> bool {
        let taken = match self.pending.lock() {
            Ok(mut pending) => pending.take(),
            Err(_) => None,
        };
        match taken {
            Some(retry) if !retry.is_finished() => {
                log::info!("Cancelled pending retry: {}", retry.reason());
                retry.cancel();
                true
            }
            _ => false,
        }
    }

    /// Returns true while a retry is waiting to fire
    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|p| p.as_ref().is_some_and(|r| !r.is_finished()))
            .unwrap_or(false)
    }

    /// Time left on the pending retry, if any
    pub fn remaining(&self) -> Option<Duration> {
        self.pending.lock().ok().and_then(|p| {
            p.as_ref()
                .filter(|r| !r.is_finished())
                .map(PendingRetry::remaining)
        })
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        if let Ok(pending) = self.pending.get_mut() {
            if let Some(retry) = pending.take() {
                retry.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let make = move || -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> {
            let c = c.clone();
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_retry_fires() {
        let scheduler = RetryScheduler::new();
        let (count, make) = counter();

        scheduler.schedule(Duration::from_secs(5), "network", make());
        assert!(scheduler.has_pending());
        assert_eq!(scheduler.remaining(), Some(Duration::from_secs(5)));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let scheduler = RetryScheduler::new();
        let (count, make) = counter();

        scheduler.schedule(Duration::from_secs(5), "network", make());
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_schedule_replaces_previous() {
        let scheduler = RetryScheduler::new();
        let (count, make) = counter();

        scheduler.schedule(Duration::from_secs(5), "first", make());
        scheduler.schedule(Duration::from_secs(8), "second", make());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
