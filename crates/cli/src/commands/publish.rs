//! Shared publish workflow
//!
//! Enumerates the artifact directory, uploads every file through the worker
//! pool, streams progress and, only when every upload succeeded, records
//! the destination reference in the step output file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use pa_core::{
    AggregateResult, Destination, Error, FailedUpload, Settings, UploadTask, Uploader,
    WorkerPool, append_output, collect_outcomes, list_files,
};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Options shared by every backend
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory containing the artifacts to publish
    #[arg(long, env = "INPUT_PATH")]
    pub path: PathBuf,

    /// Number of parallel uploads (default: 5)
    #[arg(short = 'P', long, env = "INPUT_UPLOAD_THREADS")]
    pub threads: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Stop starting new uploads after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Settings file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    /// Settings file values overridden by command-line flags
    pub fn settings(&self) -> pa_core::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;

        if let Some(threads) = self.threads {
            settings.concurrency = threads;
        }
        if let Some(timeout) = self.timeout {
            settings.request_timeout_secs = Some(timeout);
        }
        if self.fail_fast {
            settings.fail_fast = true;
        }

        settings.validate()?;
        Ok(settings)
    }
}

/// Everything needed to run one batch, validated before any upload starts
#[derive(Debug)]
pub struct PublishPlan {
    pub artifacts_dir: PathBuf,
    pub destination: Destination,
    pub output_file: Option<PathBuf>,
    pub pool: WorkerPool,
}

impl PublishPlan {
    pub fn new(
        artifacts_dir: PathBuf,
        destination: Destination,
        output_file: Option<PathBuf>,
        settings: &Settings,
    ) -> pa_core::Result<Self> {
        if !artifacts_dir.exists() {
            return Err(Error::InvalidPath(format!(
                "Artifact directory does not exist: {}",
                artifacts_dir.display()
            )));
        }
        if !artifacts_dir.is_dir() {
            return Err(Error::InvalidPath(format!(
                "Artifact path is not a directory: {}",
                artifacts_dir.display()
            )));
        }

        Ok(Self {
            artifacts_dir,
            destination,
            output_file,
            pool: settings.worker_pool()?,
        })
    }
}

#[derive(Debug, Serialize)]
struct PublishOutput {
    destination: Destination,
    reference: String,
    started_at: String,
    elapsed_ms: u128,
    total: usize,
    failed: usize,
    succeeded: bool,
    bytes_uploaded: u64,
    bytes_human: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailedUpload>,
}

impl PublishOutput {
    fn new(
        destination: &Destination,
        started_at: jiff::Timestamp,
        elapsed_ms: u128,
        result: &AggregateResult,
    ) -> Self {
        Self {
            destination: destination.clone(),
            reference: destination.reference(),
            started_at: started_at.to_string(),
            elapsed_ms,
            total: result.total_count,
            failed: result.failed_count,
            succeeded: result.succeeded,
            bytes_uploaded: result.bytes_uploaded,
            bytes_human: humansize::format_size(result.bytes_uploaded, humansize::BINARY),
            failures: result.failures.clone(),
        }
    }
}

/// Run the batch and map its verdict to an exit code
pub async fn publish(
    plan: PublishPlan,
    uploader: Arc<dyn Uploader>,
    formatter: &Formatter,
) -> ExitCode {
    let started_at = jiff::Timestamp::now();
    let clock = Instant::now();
    let reference = plan.destination.reference();

    let files = list_files(&plan.artifacts_dir);
    formatter.println(&format!(
        "= Found {} files to publish to {}",
        files.len(),
        formatter.style_url(&reference)
    ));
    if files.is_empty() {
        formatter.warning(&format!(
            "No files found in {}",
            plan.artifacts_dir.display()
        ));
    }

    let tasks = UploadTask::batch(&plan.artifacts_dir, files, &plan.destination);
    let total = tasks.len();
    tracing::info!(
        total,
        concurrency = plan.pool.concurrency(),
        destination = %reference,
        "Starting uploads"
    );

    let outcomes = plan.pool.run(uploader, tasks);
    let result = collect_outcomes(outcomes, total, |progress| formatter.progress(progress)).await;

    let elapsed = clock.elapsed();
    tracing::info!(
        total = result.total_count,
        failed = result.failed_count,
        bytes = result.bytes_uploaded,
        elapsed_ms = elapsed.as_millis() as u64,
        "Uploads finished"
    );

    if formatter.is_json() {
        formatter.json(&PublishOutput::new(
            &plan.destination,
            started_at,
            elapsed.as_millis(),
            &result,
        ));
    }

    if !result.succeeded {
        formatter.error(&format!(
            "{} of {} uploads failed",
            result.failed_count, result.total_count
        ));
        return ExitCode::GeneralError;
    }

    if let Some(output_file) = &plan.output_file
        && let Err(e) = append_output(output_file, plan.destination.output_key(), &reference)
    {
        formatter.error(&format!(
            "Failed to write step output to {}: {e}",
            output_file.display()
        ));
        return ExitCode::GeneralError;
    }

    ExitCode::Success
}
