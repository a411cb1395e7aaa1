//! S3 backend implementation
//!
//! Wraps aws-sdk-s3 and implements the Uploader trait from pa-core.
//! Credentials come from the ambient AWS provider chain. The SDK's own
//! retries are disabled so the configured backoff schedule is the only
//! retry policy, as with the signed-URL backend.

use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::timeout::TimeoutConfig;

use pa_core::{
    BackoffSchedule, Error, Result, Settings, UploadTask, Uploader, is_retryable_error,
    retry_with_schedule,
};

/// Connection options for an S3-compatible endpoint
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    /// AWS region; falls back to the provider chain
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint_url: Option<String>,
    /// Use path-style addressing (`endpoint/bucket/key`)
    pub force_path_style: bool,
}

/// Uploader writing objects directly into a bucket
pub struct S3Uploader {
    inner: aws_sdk_s3::Client,
    bucket: String,
    schedule: BackoffSchedule,
}

impl S3Uploader {
    /// Create an uploader from ambient credentials and the given options
    pub async fn new(bucket: impl Into<String>, options: &S3Options, settings: &Settings) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .retry_config(RetryConfig::disabled());

        if let Some(region) = &options.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &options.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(timeout) = settings.request_timeout() {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(timeout)
                    .build(),
            );
        }

        let config = loader.load().await;
        if config.region().is_none() {
            return Err(Error::Config(
                "No AWS region configured (set --region or AWS_REGION)".to_string(),
            ));
        }

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(options.force_path_style)
            .build();

        Ok(Self::from_client(
            aws_sdk_s3::Client::from_conf(s3_config),
            bucket,
            settings.retry.object_store.clone(),
        ))
    }

    /// Wrap an already configured client
    pub fn from_client(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        schedule: BackoffSchedule,
    ) -> Self {
        Self {
            inner: client,
            bucket: bucket.into(),
            schedule,
        }
    }

    async fn put_object_once(&self, task: &UploadTask, content_type: &str) -> Result<()> {
        let body = ByteStream::from_path(task.local_path())
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(task.destination_ref())
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| map_put_error(&e))?;

        Ok(())
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, task: &UploadTask) -> Result<u64> {
        let size = tokio::fs::metadata(task.local_path()).await?.len();
        let content_type = mime_guess::from_path(task.local_path())
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        retry_with_schedule(
            &self.schedule,
            || self.put_object_once(task, &content_type),
            is_retryable_error,
            |attempt, error, delay| {
                tracing::warn!(
                    bucket = %self.bucket,
                    key = task.destination_ref(),
                    attempt,
                    error = %error,
                    "Unable to put object, retrying in {}s",
                    delay.as_secs_f32()
                );
            },
        )
        .await?;

        Ok(size)
    }
}

/// Convert an SDK error into the shared error taxonomy
fn map_put_error(error: &SdkError<PutObjectError>) -> Error {
    match error {
        SdkError::ServiceError(service_err) => {
            let err = service_err.err();
            let status = service_err.raw().status().as_u16();
            let mut body = err.message().unwrap_or("service error").to_string();
            if let Some(code) = err.code() {
                body = format!("{code}: {body}");
            }
            Error::Upload { status, body }
        }
        SdkError::TimeoutError(_) => Error::Timeout("S3 request timed out".to_string()),
        SdkError::DispatchFailure(failure) => {
            if failure.is_timeout() {
                Error::Timeout(format!("{error:?}"))
            } else if failure.is_io() {
                Error::Connection(format!("{error:?}"))
            } else {
                Error::Network(format!("Network dispatch error: {error:?}"))
            }
        }
        SdkError::ResponseError(err) => Error::Network(format!("Response error: {err:?}")),
        SdkError::ConstructionFailure(err) => {
            Error::General(format!("Request construction failed: {err:?}"))
        }
        _ => Error::General(error.to_string()),
    }
}
