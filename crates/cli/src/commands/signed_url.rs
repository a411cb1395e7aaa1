//! signed-url command - Publish through the file server
//!
//! Every file is first exchanged for a signed URL using the runtime
//! token, then its bytes are PUT to that URL.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use pa_core::{AuthToken, Destination, run_base_url};
use pa_storage::SignedUrlUploader;

use super::publish::{CommonArgs, PublishPlan, publish};
use super::usage_error;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Environment variable holding the bearer token for the file server
pub const TOKEN_ENV: &str = "ACTIONS_RUNTIME_TOKEN";

/// Publish a directory through the signed-URL file server
#[derive(Args, Debug)]
pub struct SignedUrlArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Base URL of the file server
    #[arg(long, env = "INPUT_FILESERVER_URL")]
    pub fileserver_url: String,

    /// Repository in owner/name form
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: String,

    /// Workflow run id
    #[arg(long, env = "GITHUB_RUN_ID")]
    pub run_id: String,

    /// Workflow run attempt
    #[arg(long, env = "GITHUB_RUN_ATTEMPT")]
    pub run_attempt: String,

    /// Step output file that receives `build_url=` on success
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: PathBuf,
}

pub async fn execute(args: SignedUrlArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let token = match AuthToken::from_env(TOKEN_ENV) {
        Ok(t) => t,
        Err(e) => return usage_error(&formatter, e),
    };

    let settings = match args.common.settings() {
        Ok(s) => s,
        Err(e) => return usage_error(&formatter, e),
    };

    let base_url = run_base_url(
        &args.fileserver_url,
        &args.repository,
        &args.run_id,
        &args.run_attempt,
    );
    let destination = match Destination::signed_url(&base_url) {
        Ok(d) => d,
        Err(e) => return usage_error(&formatter, e),
    };

    let plan = match PublishPlan::new(
        args.common.path.clone(),
        destination,
        Some(args.output_file),
        &settings,
    ) {
        Ok(p) => p,
        Err(e) => return usage_error(&formatter, e),
    };

    let uploader = match SignedUrlUploader::new(token, &settings) {
        Ok(u) => u,
        Err(e) => {
            formatter.error(&format!("Failed to create HTTP client: {e}"));
            return ExitCode::GeneralError;
        }
    };

    publish(plan, Arc::new(uploader), &formatter).await
}
