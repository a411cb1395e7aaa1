//! publish-artifacts - upload a CI build's artifact directory
//!
//! Uploads every file under a directory either through a signed-URL file
//! server or directly into S3, then records where they went in the step
//! output file.

mod commands;
mod exit_code;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::Commands;
use output::OutputConfig;

/// Environment variable overriding the log filter
const LOG_ENV: &str = "PUBLISH_ARTIFACTS_LOG";

/// Publish CI build artifacts
#[derive(Parser, Debug)]
#[command(name = "publish-artifacts", version, about, long_about = None)]
pub struct Cli {
    /// Print a JSON summary instead of progress lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print failed uploads and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(if debug { "debug" } else { "warn" }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.debug) {
        eprintln!("{e}");
    }

    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    commands::execute(cli.command, output_config).await.into()
}
