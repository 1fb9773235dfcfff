// crates/resilience/src/lib.rs
//! Resilience patterns for sync operations
//!
//! - Retry with exponential backoff
//! - Timeout handling
//! - Scheduled retries behind a cancellable handle
//!
//! # Example
//!
//! ```rust
//! use momentum_resilience::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3)
//!     .with_initial_delay(Duration::from_millis(100))
//!     .with_jitter(false);
//!
//! assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
//! ```

mod error;
mod retry;
mod scheduler;
mod timeout;

pub use error::{ResilienceError, ResilienceResult};
pub use retry::{retry_if, with_retry, RetryPolicy};
pub use scheduler::{PendingRetry, RetryScheduler};
pub use timeout::{with_timeout, Timeout};
