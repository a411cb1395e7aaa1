//! Upload tasks and their outcomes

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::destination::Destination;
use crate::error::Error;

/// One file to upload to one destination identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    relative_path: String,
    local_path: PathBuf,
    destination_ref: String,
}

impl UploadTask {
    pub fn new(root: &Path, relative_path: impl Into<String>, destination: &Destination) -> Self {
        let relative_path = relative_path.into();
        Self {
            local_path: root.join(&relative_path),
            destination_ref: destination.target_for(&relative_path),
            relative_path,
        }
    }

    /// Build one task per enumerated relative path
    pub fn batch(root: &Path, relative_paths: Vec<String>, destination: &Destination) -> Vec<Self> {
        relative_paths
            .into_iter()
            .map(|relative| Self::new(root, relative, destination))
            .collect()
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Signed-URL endpoint or object key, depending on the backend
    pub fn destination_ref(&self) -> &str {
        &self.destination_ref
    }
}

/// Result of one upload task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub relative_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Bytes sent for a successful upload, 0 otherwise
    pub bytes: u64,
}

impl UploadOutcome {
    pub fn success(relative_path: impl Into<String>, bytes: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            error: None,
            bytes,
        }
    }

    pub fn failure(relative_path: impl Into<String>, error: &Error) -> Self {
        Self {
            relative_path: relative_path.into(),
            error: Some(error.to_string()),
            bytes: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
