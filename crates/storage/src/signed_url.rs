//! Signed-URL file server backend
//!
//! Uploading is a two-stage protocol. First an authenticated PUT against
//! `{base_url}{relative_path}` asks the file server for a signed storage
//! URL, returned in the `location` header without following the redirect.
//! Then the file content is streamed to that location, reopening the file
//! on every attempt so no artifact is held in memory.

use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use tokio_util::io::ReaderStream;

use pa_core::{
    AuthToken, BackoffSchedule, Error, Result, Settings, UploadTask, Uploader,
    is_retryable_error, retry_with_schedule,
};

/// Header carrying the bearer token; the file server expects this name
pub const AUTH_HEADER: &str = "Authentication";

/// Diagnostic header echoed by the file server
pub const CORRELATION_HEADER: &str = "X-Correlation-ID";

const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Uploader for the signed-URL file server
pub struct SignedUrlUploader {
    http: reqwest::Client,
    token: AuthToken,
    signed_url_schedule: BackoffSchedule,
    content_schedule: BackoffSchedule,
}

impl SignedUrlUploader {
    pub fn new(token: AuthToken, settings: &Settings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("publish-artifacts/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            token,
            signed_url_schedule: settings.retry.signed_url.clone(),
            content_schedule: settings.retry.content.clone(),
        })
    }

    /// Ask the file server for the storage location of one file
    async fn request_signed_url(&self, task: &UploadTask) -> Result<String> {
        retry_with_schedule(
            &self.signed_url_schedule,
            || self.request_signed_url_once(task),
            is_retryable_error,
            |attempt, error, delay| {
                tracing::warn!(
                    path = task.relative_path(),
                    attempt,
                    error = %error,
                    "Error getting signed URL, retrying in {}s",
                    delay.as_secs_f32()
                );
            },
        )
        .await
    }

    async fn request_signed_url_once(&self, task: &UploadTask) -> Result<String> {
        let response = self
            .http
            .put(task.destination_ref())
            .header(AUTH_HEADER, self.token.bearer())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !is_ok(status) {
            let correlation_id = response
                .headers()
                .get(CORRELATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SignedUrl {
                status: status.as_u16(),
                correlation_id,
                body,
            });
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::MissingLocation(task.relative_path().to_string()))
    }

    async fn put_content(&self, task: &UploadTask, location: &str, size: u64) -> Result<()> {
        retry_with_schedule(
            &self.content_schedule,
            || self.put_content_once(location, task.local_path(), size),
            is_retryable_error,
            |attempt, error, delay| {
                tracing::warn!(
                    path = task.relative_path(),
                    attempt,
                    error = %error,
                    "Unable to upload content, retrying in {}s",
                    delay.as_secs_f32()
                );
            },
        )
        .await
    }

    async fn put_content_once(&self, location: &str, path: &Path, size: u64) -> Result<()> {
        let file = tokio::fs::File::open(path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .http
            .put(location)
            .header(CONTENT_TYPE, CONTENT_TYPE_OCTET_STREAM)
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !is_ok(status) {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upload {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Uploader for SignedUrlUploader {
    async fn upload(&self, task: &UploadTask) -> Result<u64> {
        let location = self.request_signed_url(task).await?;
        tracing::debug!(path = task.relative_path(), %location, "Obtained signed URL");

        let size = tokio::fs::metadata(task.local_path()).await?.len();

        self.put_content(task, &location, size).await?;
        Ok(size)
    }
}

/// Redirects count as success; only 4xx and 5xx are failures
fn is_ok(status: StatusCode) -> bool {
    status.as_u16() < 400
}

fn transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout(error.to_string())
    } else if error.is_connect() {
        Error::Connection(error.to_string())
    } else {
        Error::Network(error.to_string())
    }
}
