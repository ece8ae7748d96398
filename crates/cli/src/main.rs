//! bsync - sync a local directory to S3-compatible object storage
//!
//! Typically run as a deploy step in CI: settings come from a config file,
//! `INPUT_*` environment variables or flags.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod exit_code;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags
    let default_level = if cli.debug {
        "debug"
    } else if cli.quiet || cli.json {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(filter)
        .init();

    let exit_code =
        commands::until_interrupted(commands::execute(cli), tokio::signal::ctrl_c()).await;

    std::process::exit(exit_code.as_i32());
}
