//! Error types for publish-artifacts
//!
//! Per-file errors are converted into outcome data by the worker pool, so
//! only configuration errors ever abort a run.

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or performing uploads
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (environment, flags, settings file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local path is unusable (missing, not a directory, not UTF-8)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file server refused to hand out a signed URL
    #[error("Unable to get signed url HTTP_{status}. Correlation ID: {} - {body}", .correlation_id.as_deref().unwrap_or("?"))]
    SignedUrl {
        status: u16,
        correlation_id: Option<String>,
        body: String,
    },

    /// The storage endpoint rejected the file content
    #[error("Unable to upload content HTTP_{status} - {body}")]
    Upload { status: u16, body: String },

    /// A signed URL response without a `location` header
    #[error("Signed URL response for {0} has no location header")]
    MissingLocation(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection could not be established or was reset
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Not attempted because fail-fast tripped on an earlier failure
    #[error("skipped after an earlier upload failed")]
    Skipped,

    #[error("upload task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    General(String),
}
