//! CLI command implementations
//!
//! Each backend subcommand builds a [`publish::PublishPlan`] and an
//! uploader, then hands both to the shared publish workflow.

mod completions;
mod publish;
mod s3;
mod signed_url;

use clap::Subcommand;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

pub use completions::CompletionsArgs;
pub use s3::S3Args;
pub use signed_url::SignedUrlArgs;

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish artifacts through the signed-URL file server
    #[command(name = "signed-url")]
    SignedUrl(SignedUrlArgs),

    /// Publish artifacts directly into an S3 bucket
    S3(S3Args),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

/// Execute a command
pub async fn execute(cmd: Commands, output_config: OutputConfig) -> ExitCode {
    match cmd {
        Commands::SignedUrl(args) => signed_url::execute(args, output_config).await,
        Commands::S3(args) => s3::execute(args, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Report a configuration problem and map it to the usage exit code
fn usage_error(formatter: &Formatter, error: impl std::fmt::Display) -> ExitCode {
    formatter.error(&error.to_string());
    ExitCode::UsageError
}
