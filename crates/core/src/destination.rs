//! Upload destinations
//!
//! A destination turns a relative artifact path into the identifier a
//! backend uploads to, and exposes the discoverable reference that is
//! published for downstream pipeline steps.

use serde::Serialize;

use crate::error::{Error, Result};

/// Where a batch of artifacts is published
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum Destination {
    /// File server handing out signed URLs, addressed by `{base_url}{path}`
    SignedUrl { base_url: String },
    /// S3-compatible bucket, addressed by `{prefix}{path}`
    ObjectStore { bucket: String, prefix: String },
}

impl Destination {
    /// Create a signed-URL destination; the base URL always ends with `/`
    pub fn signed_url(base_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid file server URL '{base_url}': {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "File server URL must be http or https: {base_url}"
            )));
        }

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self::SignedUrl { base_url })
    }

    /// Create an object-store destination
    ///
    /// The prefix is normalized to have no leading `/` and, when non-empty,
    /// exactly one trailing `/`.
    pub fn object_store(bucket: &str, prefix: &str) -> Result<Self> {
        let bucket = bucket.trim();
        if bucket.is_empty() {
            return Err(Error::Config("Bucket name cannot be empty".to_string()));
        }
        if bucket.contains('/') {
            return Err(Error::Config(format!(
                "Bucket name cannot contain '/': {bucket}"
            )));
        }

        let trimmed = prefix.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        };

        Ok(Self::ObjectStore {
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// The location published once the whole batch succeeded
    pub fn reference(&self) -> String {
        match self {
            Self::SignedUrl { base_url } => base_url.clone(),
            Self::ObjectStore { bucket, prefix } => format!("s3://{bucket}/{prefix}"),
        }
    }

    /// Per-file destination identifier for a forward-slash relative path
    pub fn target_for(&self, relative_path: &str) -> String {
        match self {
            Self::SignedUrl { base_url } => {
                let encoded: Vec<_> = relative_path
                    .split('/')
                    .map(urlencoding::encode)
                    .collect();
                format!("{base_url}{}", encoded.join("/"))
            }
            Self::ObjectStore { prefix, .. } => format!("{prefix}{relative_path}"),
        }
    }

    /// Key of the side-channel line recording [`Destination::reference`]
    pub fn output_key(&self) -> &'static str {
        match self {
            Self::SignedUrl { .. } => "build_url",
            Self::ObjectStore { .. } => "s3_url",
        }
    }
}

/// Per-run path segment: `{repository}/{run_id}-{run_attempt}/`
pub fn run_path(repository: &str, run_id: &str, run_attempt: &str) -> String {
    format!(
        "{}/{}-{}/",
        repository.trim_matches('/'),
        run_id.trim(),
        run_attempt.trim()
    )
}

/// Base URL for one CI run on the file server
pub fn run_base_url(file_server: &str, repository: &str, run_id: &str, run_attempt: &str) -> String {
    format!(
        "{}/{}",
        file_server.trim_end_matches('/'),
        run_path(repository, run_id, run_attempt)
    )
}
