//! CLI command definitions and execution
//!
//! `sync` and `plan` share the configuration arguments in [`source`];
//! `completions` only needs the command tree.

use std::future::Future;

use clap::{Parser, Subcommand};

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

mod completions;
mod plan;
pub mod source;
mod sync;

/// bsync - one-way sync of a local directory to S3-compatible storage
///
/// Uploads new and changed files under a bucket prefix and removes remote
/// files that no longer exist locally. Works with AWS S3, Aliyun OSS, RustFS
/// and other S3-compatible services.
#[derive(Parser, Debug)]
#[command(name = "bsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync a local directory to the bucket
    Sync(sync::SyncArgs),

    /// Show what a sync would upload and delete
    Plan(plan::PlanArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
        github_actions: OutputConfig::detect_github_actions(),
    };

    match cli.command {
        Commands::Sync(args) => sync::execute(args, output_config).await,
        Commands::Plan(args) => plan::execute(args, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Run `command` unless `interrupt` resolves first
///
/// In-flight uploads are abandoned; objects already written stay.
pub async fn until_interrupted<C, I>(command: C, interrupt: I) -> ExitCode
where
    C: Future<Output = ExitCode>,
    I: Future,
{
    tokio::select! {
        code = command => code,
        _ = interrupt => {
            tracing::warn!("Interrupted, stopping sync");
            ExitCode::Interrupted
        }
    }
}
