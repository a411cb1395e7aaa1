//! Folding upload outcomes into a batch verdict

use std::fmt;

use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::task::UploadOutcome;

/// Progress report for one completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub index: usize,
    pub total: usize,
    pub relative_path: String,
    pub error: Option<String>,
}

impl Progress {
    /// `= k of total - relative_path`
    pub fn status_line(&self) -> String {
        format!("= {} of {} - {}", self.index, self.total, self.relative_path)
    }

    /// `|-> ERROR: message` for failed uploads
    pub fn error_line(&self) -> Option<String> {
        self.error.as_ref().map(|e| format!("|-> ERROR: {e}"))
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_line())?;
        if let Some(line) = self.error_line() {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpload {
    pub relative_path: String,
    pub error: String,
}

/// Final verdict of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub total_count: usize,
    pub failed_count: usize,
    pub succeeded: bool,
    pub bytes_uploaded: u64,
    pub failures: Vec<FailedUpload>,
}

/// Running tallies over a stream of outcomes
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    total: usize,
    completed: usize,
    bytes: u64,
    failures: Vec<FailedUpload>,
}

impl ResultAggregator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            bytes: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: UploadOutcome) -> Progress {
        self.completed += 1;
        self.bytes += outcome.bytes;

        if let Some(error) = &outcome.error {
            self.failures.push(FailedUpload {
                relative_path: outcome.relative_path.clone(),
                error: error.clone(),
            });
        }

        Progress {
            index: self.completed,
            total: self.total,
            relative_path: outcome.relative_path,
            error: outcome.error,
        }
    }

    pub fn finish(self) -> AggregateResult {
        if self.completed != self.total {
            tracing::warn!(
                expected = self.total,
                received = self.completed,
                "Outcome count does not match task count"
            );
        }

        let failed_count = self.failures.len();
        AggregateResult {
            total_count: self.completed,
            failed_count,
            succeeded: failed_count == 0 && self.completed == self.total,
            bytes_uploaded: self.bytes,
            failures: self.failures,
        }
    }
}

/// Drain an outcome stream, reporting each completion to `on_progress`
pub async fn collect_outcomes<S, F>(outcomes: S, total: usize, mut on_progress: F) -> AggregateResult
where
    S: Stream<Item = UploadOutcome>,
    F: FnMut(&Progress),
{
    let mut aggregator = ResultAggregator::new(total);
    futures::pin_mut!(outcomes);

    while let Some(outcome) = outcomes.next().await {
        let progress = aggregator.record(outcome);
        on_progress(&progress);
    }

    aggregator.finish()
}
