//! Uploader trait implemented by each storage backend
//!
//! The worker pool only depends on this trait, so backends can be swapped
//! and tests can substitute a mock.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::Result;
use crate::task::UploadTask;

/// Uploads a single file to the identifier carried by its task
///
/// Implementations apply their own retry schedule and return the number of
/// bytes sent. Errors are turned into failed outcomes by the pool.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, task: &UploadTask) -> Result<u64>;
}
