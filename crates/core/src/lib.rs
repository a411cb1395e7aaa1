//! pa-core: Core library for publish-artifacts
//!
//! This crate provides the backend-independent pieces of an artifact
//! upload, including:
//! - Local file enumeration
//! - Upload destinations and tasks
//! - Fixed-schedule retry
//! - The Uploader trait and a bounded worker pool
//! - Outcome aggregation and step output
//!
//! Storage backends live in `pa-storage` and only need to implement
//! [`Uploader`].

pub mod aggregate;
pub mod config;
pub mod destination;
pub mod error;
pub mod output_file;
pub mod pool;
pub mod retry;
pub mod task;
pub mod traits;
pub mod walk;

pub use aggregate::{AggregateResult, FailedUpload, Progress, ResultAggregator, collect_outcomes};
pub use config::{AuthToken, RetrySettings, Settings};
pub use destination::{Destination, run_base_url, run_path};
pub use error::{Error, Result};
pub use output_file::append_output;
pub use pool::WorkerPool;
pub use retry::{BackoffSchedule, is_retryable_error, retry_with_schedule};
pub use task::{UploadOutcome, UploadTask};
pub use traits::Uploader;
pub use walk::list_files;

#[cfg(any(test, feature = "test-export-mocks"))]
pub use traits::MockUploader;
