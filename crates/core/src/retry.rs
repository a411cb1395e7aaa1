//! Retry mechanism with a fixed backoff schedule
//!
//! Each upload stage owns a schedule of delays. A stage is attempted once,
//! then once more after every delay in the schedule; when the schedule runs
//! out the last error is returned.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Ordered wait durations between attempts of one upload stage
///
/// Serialized as a list of whole seconds, e.g. `[1, 2, 3, 5]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn from_secs(secs: &[u64]) -> Self {
        Self::new(secs.iter().copied().map(Duration::from_secs).collect())
    }

    /// Fibonacci-like schedule used when requesting a signed URL
    pub fn signed_url() -> Self {
        Self::from_secs(&[1, 2, 3, 5])
    }

    /// Schedule used when sending file content
    pub fn content() -> Self {
        Self::from_secs(&[1, 2, 3])
    }

    /// A schedule that never retries
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    /// Total attempts, the initial one included
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Delay before the attempt following `attempt` (1-based), if any
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        attempt
            .checked_sub(1)
            .and_then(|idx| self.delays.get(idx))
            .copied()
    }
}

impl Serialize for BackoffSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.delays.iter().map(Duration::as_secs))
    }
}

impl<'de> Deserialize<'de> for BackoffSchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let secs = Vec::<u64>::deserialize(deserializer)?;
        Ok(Self::from_secs(&secs))
    }
}

/// Retry a fallible async operation following a fixed schedule
///
/// `on_retry` is invoked with the 1-based attempt number, the error and the
/// delay before the next attempt, so callers can log the failure in their
/// own terms.
///
/// # Example
/// ```ignore
/// let bytes = retry_with_schedule(
///     &BackoffSchedule::content(),
///     || async { put_content(&url, body.clone()).await },
///     is_retryable_error,
///     |attempt, err, delay| tracing::warn!(attempt, %err, ?delay, "retrying"),
/// ).await?;
/// ```
pub async fn retry_with_schedule<T, F, Fut, R, N>(
    schedule: &BackoffSchedule,
    mut operation: F,
    is_retryable: R,
    mut on_retry: N,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    R: Fn(&Error) -> bool,
    N: FnMut(usize, &Error, Duration),
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }

                let Some(delay) = schedule.delay_after(attempt) else {
                    tracing::debug!(attempt, error = %e, "Backoff schedule exhausted");
                    return Err(e);
                };

                on_retry(attempt, &e, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Check if an error is transient and worth another attempt
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::SignedUrl { .. }
        | Error::Upload { .. }
        | Error::Timeout(_)
        | Error::Connection(_) => true,
        Error::Config(_)
        | Error::InvalidPath(_)
        | Error::Io(_)
        | Error::MissingLocation(_)
        | Error::Network(_)
        | Error::Skipped
        | Error::Panicked(_)
        | Error::General(_) => false,
    }
}
