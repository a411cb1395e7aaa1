//! s3 command - Publish directly into a bucket
//!
//! Credentials come from the standard AWS provider chain.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use pa_core::{Destination, run_path};
use pa_storage::{S3Options, S3Uploader};

use super::publish::{CommonArgs, PublishPlan, publish};
use super::usage_error;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Publish a directory into an S3 bucket
#[derive(Args, Debug)]
pub struct S3Args {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Target bucket
    #[arg(long, env = "INPUT_S3_BUCKET")]
    pub bucket: String,

    /// Key prefix (default: owner/name/run_id-run_attempt/ when running in a workflow)
    #[arg(long, env = "INPUT_S3_PREFIX")]
    pub prefix: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible services
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing
    #[arg(long)]
    pub path_style: bool,

    /// Step output file that receives `s3_url=` on success
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,
}

impl S3Args {
    /// Explicit prefix, else the workflow run path, else the bucket root
    fn resolve_prefix(&self) -> String {
        if let Some(prefix) = &self.prefix {
            return prefix.clone();
        }
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        match (
            var("GITHUB_REPOSITORY"),
            var("GITHUB_RUN_ID"),
            var("GITHUB_RUN_ATTEMPT"),
        ) {
            (Some(repo), Some(id), Some(attempt)) => run_path(&repo, &id, &attempt),
            _ => String::new(),
        }
    }

    fn options(&self) -> S3Options {
        S3Options {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.path_style,
        }
    }
}

pub async fn execute(args: S3Args, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let settings = match args.common.settings() {
        Ok(s) => s,
        Err(e) => return usage_error(&formatter, e),
    };

    let destination = match Destination::object_store(&args.bucket, &args.resolve_prefix()) {
        Ok(d) => d,
        Err(e) => return usage_error(&formatter, e),
    };

    let plan = match PublishPlan::new(
        args.common.path.clone(),
        destination,
        args.output_file.clone(),
        &settings,
    ) {
        Ok(p) => p,
        Err(e) => return usage_error(&formatter, e),
    };

    let uploader = match S3Uploader::new(&args.bucket, &args.options(), &settings).await {
        Ok(u) => u,
        Err(e) => return usage_error(&formatter, e),
    };

    publish(plan, Arc::new(uploader), &formatter).await
}
