// crates/sync-engine/src/batch.rs
//! Chunked uploads, deletes and paged downloads

use crate::classify::{classify, ClassifiedError};
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteError, RemoteErrorCode, RemoteRecord, RemoteStore, WriteOutcome};
use momentum_core::RecordId;
use momentum_resilience::{retry_if, RetryPolicy, Timeout};
use std::future::Future;

/// Records per request unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Largest request the record store accepts
pub const MAX_BATCH_SIZE: usize = 400;

/// Splits `records` into consecutive chunks of at most `size`
///
/// Concatenating the chunks in order reproduces `records`. A size of zero is
/// treated as one.
pub fn batches<T>(records: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    records.chunks(size.max(1))
}

/// Outcome of one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Position of the chunk within its call
    pub index: usize,
    /// Records sent in the chunk
    pub attempted: usize,
    pub succeeded: Vec<RecordId>,
    pub failed: Vec<RecordId>,
    /// Set when the whole request failed
    pub error: Option<ClassifiedError>,
}

impl BatchResult {
    fn from_outcome(index: usize, attempted: usize, outcome: WriteOutcome) -> Self {
        Self {
            index,
            attempted,
            succeeded: outcome.succeeded,
            failed: outcome.failed.into_iter().map(|(id, _)| id).collect(),
            error: None,
        }
    }

    fn from_error(index: usize, ids: Vec<RecordId>, error: &SyncError) -> Self {
        Self {
            index,
            attempted: ids.len(),
            succeeded: Vec::new(),
            failed: ids,
            error: Some(classify(error)),
        }
    }

    /// True when every record in the chunk was written
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.failed.is_empty()
    }
}

/// First request-level failure in a list of chunk results
pub fn transport_failure(results: &[BatchResult]) -> Option<&ClassifiedError> {
    results.iter().find_map(|r| r.error.as_ref())
}

/// Progress observer, called with the fraction of chunks finished
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

async fn timed<T, F>(timeout: Timeout, request: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match timeout.execute(request).await {
        Ok(result) => result,
        Err(e) => Err(RemoteError::new(RemoteErrorCode::NetworkFailure, e.to_string())),
    }
}

/// Writes records to the remote store one chunk at a time
#[derive(Debug, Clone)]
pub struct BatchUploader {
    batch_size: usize,
    retry: RetryPolicy,
    timeout: Timeout,
}

impl Default for BatchUploader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchUploader {
    /// Creates an uploader; the size is clamped to `1..=MAX_BATCH_SIZE`
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            retry: RetryPolicy::none(),
            timeout: Timeout::default(),
        }
    }

    /// Resends a chunk the store throttled, up to the policy's attempts
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Saves `records`, one request per chunk, awaiting each
    ///
    /// Stops after the first request-level failure; that chunk is the last
    /// entry in the returned list.
    pub async fn upload(
        &self,
        remote: &dyn RemoteStore,
        record_type: &str,
        records: &[RemoteRecord],
        progress: Option<ProgressFn<'_>>,
    ) -> Vec<BatchResult> {
        let total = records.len().div_ceil(self.batch_size);
        let mut results = Vec::with_capacity(total);

        for (index, chunk) in batches(records, self.batch_size).enumerate() {
            let outcome = retry_if(
                &self.retry,
                |e: &RemoteError| e.code.is_throttle(),
                || timed(self.timeout, remote.save(record_type, chunk.to_vec())),
            )
            .await;

            let result = match outcome {
                Ok(outcome) => BatchResult::from_outcome(index, chunk.len(), outcome),
                Err(e) => {
                    let ids = chunk.iter().map(|r| r.record_id).collect();
                    BatchResult::from_error(index, ids, &SyncError::Remote(e))
                }
            };
            log_result("Uploaded", record_type, total, &result);

            let failed = result.error.is_some();
            results.push(result);
            if failed {
                break;
            }
            if let Some(report) = progress {
                report((index + 1) as f64 / total as f64);
            }
        }

        results
    }

    /// Deletes `ids`, one request per chunk, awaiting each
    pub async fn delete(
        &self,
        remote: &dyn RemoteStore,
        record_type: &str,
        ids: &[RecordId],
    ) -> Vec<BatchResult> {
        let total = ids.len().div_ceil(self.batch_size);
        let mut results = Vec::with_capacity(total);

        for (index, chunk) in batches(ids, self.batch_size).enumerate() {
            let outcome = retry_if(
                &self.retry,
                |e: &RemoteError| e.code.is_throttle(),
                || timed(self.timeout, remote.delete(record_type, chunk.to_vec())),
            )
            .await;

            let result = match outcome {
                Ok(outcome) => BatchResult::from_outcome(index, chunk.len(), outcome),
                Err(e) => BatchResult::from_error(index, chunk.to_vec(), &SyncError::Remote(e)),
            };
            log_result("Deleted", record_type, total, &result);

            let failed = result.error.is_some();
            results.push(result);
            if failed {
                break;
            }
        }

        results
    }
}

fn log_result(action: &str, record_type: &str, total: usize, result: &BatchResult) {
    match &result.error {
        None => log::info!(
            "{} {} batch {}/{}: {} ok, {} failed",
            action,
            record_type,
            result.index + 1,
            total,
            result.succeeded.len(),
            result.failed.len()
        ),
        Some(error) => log::warn!(
            "{} {} batch {}/{} failed: {}",
            action,
            record_type,
            result.index + 1,
            total,
            error
        ),
    }
}

/// Reads every record of a type page by page
#[derive(Debug, Clone)]
pub struct BatchDownloader {
    page_size: usize,
    timeout: Timeout,
}

impl Default for BatchDownloader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchDownloader {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.clamp(1, MAX_BATCH_SIZE),
            timeout: Timeout::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetches all records of `record_type`
    pub async fn download(
        &self,
        remote: &dyn RemoteStore,
        record_type: &str,
    ) -> SyncResult<Vec<RemoteRecord>> {
        let mut records = Vec::new();
        let mut cursor = None;
        loop {
            let page = timed(
                self.timeout,
                remote.query(record_type, cursor.take(), self.page_size),
            )
            .await?;
            records.extend(page.records);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        log::debug!("Downloaded {} {} records", records.len(), record_type);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_reassemble() {
        let records: Vec<u32> = (0..1037).collect();
        for size in [1, 7, 100, 400, 5000] {
            let rebuilt: Vec<u32> = batches(&records, size).flatten().copied().collect();
            assert_eq!(rebuilt, records, "size {}", size);
        }
    }

    #[test]
    fn test_batch_sizes() {
        let records = vec![0u8; 250];
        let sizes: Vec<usize> = batches(&records, 100).map(<[u8]>::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_zero_size_is_one() {
        let records = [1, 2, 3];
        assert_eq!(batches(&records, 0).count(), 3);
    }

    #[test]
    fn test_uploader_clamps_size() {
        assert_eq!(BatchUploader::new(0).batch_size(), 1);
        assert_eq!(BatchUploader::new(1000).batch_size(), MAX_BATCH_SIZE);
        assert_eq!(BatchUploader::default().batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_transport_failure_lookup() {
        let ok = BatchResult {
            index: 0,
            attempted: 1,
            succeeded: vec![RecordId::new()],
            failed: vec![],
            error: None,
        };
        assert!(ok.is_success());
        assert!(transport_failure(std::slice::from_ref(&ok)).is_none());

        let err = SyncError::Remote(RemoteError::new(RemoteErrorCode::ZoneBusy, "busy"));
        let bad = BatchResult::from_error(1, vec![RecordId::new()], &err);
        assert!(!bad.is_success());
        assert_eq!(
            transport_failure(&[ok, bad]).map(|e| e.kind),
            Some(crate::classify::SyncErrorKind::DeviceBusy)
        );
    }
}
