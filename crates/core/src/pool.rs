//! Bounded-concurrency worker pool
//!
//! Runs an [`Uploader`] over a batch of tasks with at most `concurrency`
//! uploads in flight and yields outcomes in completion order. Every task
//! yields exactly one outcome: upload errors and panics become failed
//! outcomes instead of tearing down the batch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};

use crate::error::{Error, Result};
use crate::task::{UploadOutcome, UploadTask};
use crate::traits::Uploader;

/// Fixed-size pool of concurrent uploads
#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency: usize,
    fail_fast: bool,
}

impl WorkerPool {
    pub const DEFAULT_CONCURRENCY: usize = 5;

    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(Error::Config(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            concurrency,
            fail_fast: false,
        })
    }

    /// Stop starting new uploads once one has failed
    ///
    /// Tasks that never start still yield a [`Error::Skipped`] outcome.
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Upload every task, yielding outcomes as they complete
    pub fn run(
        &self,
        uploader: Arc<dyn Uploader>,
        tasks: Vec<UploadTask>,
    ) -> BoxStream<'static, UploadOutcome> {
        let tripped = Arc::new(AtomicBool::new(false));
        let fail_fast = self.fail_fast;

        stream::iter(tasks)
            .map(move |task| {
                let uploader = uploader.clone();
                let tripped = tripped.clone();
                async move {
                    if fail_fast && tripped.load(Ordering::SeqCst) {
                        return UploadOutcome::failure(task.relative_path(), &Error::Skipped);
                    }

                    let outcome = execute(uploader.as_ref(), &task).await;
                    if fail_fast && !outcome.is_success() {
                        tripped.store(true, Ordering::SeqCst);
                    }
                    outcome
                }
            })
            .buffer_unordered(self.concurrency)
            .boxed()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            concurrency: Self::DEFAULT_CONCURRENCY,
            fail_fast: false,
        }
    }
}

/// Run one upload and convert whatever happens into an outcome
pub async fn execute(uploader: &dyn Uploader, task: &UploadTask) -> UploadOutcome {
    match AssertUnwindSafe(uploader.upload(task)).catch_unwind().await {
        Ok(Ok(bytes)) => {
            tracing::debug!(path = task.relative_path(), bytes, "Upload finished");
            UploadOutcome::success(task.relative_path(), bytes)
        }
        Ok(Err(e)) => {
            tracing::debug!(path = task.relative_path(), error = %e, "Upload failed");
            UploadOutcome::failure(task.relative_path(), &e)
        }
        Err(panic) => {
            let e = Error::Panicked(panic_message(panic.as_ref()));
            tracing::error!(path = task.relative_path(), error = %e, "Upload panicked");
            UploadOutcome::failure(task.relative_path(), &e)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
