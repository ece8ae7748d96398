//! sync command - Mirror a local directory into the bucket
//!
//! Uploads new and changed files under the remote prefix and deletes remote
//! files that no longer exist locally.

use clap::Args;
use serde::Serialize;

use bs_core::{SyncEngine, SyncReport};

use super::source::SourceArgs;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Reporter};

/// Sync a local directory to the bucket
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Log the planned uploads and deletes without changing the bucket
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct SyncOutput {
    status: &'static str,
    skipped_files: usize,
    bytes_uploaded_human: String,
    #[serde(flatten)]
    report: SyncReport,
}

/// Execute the sync command
pub async fn execute(args: SyncArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    let (job, client) = match args.source.prepare().await {
        Ok(prepared) => prepared,
        Err(e) => {
            formatter.error(&format!("Failed to prepare sync: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let reporter = Reporter::new(output_config);
    let engine = SyncEngine::new(&client, &job).with_events(&reporter);

    let report = match engine.run(args.dry_run).await {
        Ok(report) => report,
        Err(e) => {
            reporter.abort();
            formatter.error(&format!("Sync failed: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let size_human = humansize::format_size(report.execution.bytes_uploaded, humansize::BINARY);

    if formatter.is_json() {
        formatter.json(&SyncOutput {
            status: "success",
            skipped_files: reporter.skipped(),
            bytes_uploaded_human: size_human,
            report,
        });
        return ExitCode::Success;
    }

    if reporter.skipped() > 0 {
        formatter.println(&format!(
            "Skipped {} local files by filter",
            reporter.skipped()
        ));
    }

    let pending_deletes = report.plan.delete.len();
    if report.execution.delete_skipped && pending_deletes > 0 {
        formatter.warning(&format!(
            "Kept {pending_deletes} remote files missing locally (no-delete-remote-files is set)"
        ));
    }

    if report.execution.dry_run {
        formatter.success(&format!(
            "Dry run: would upload {} and delete {} files",
            report.execution.uploaded, report.execution.deleted
        ));
    } else if report.plan.is_empty() {
        formatter.success("Bucket is already up to date");
    } else {
        formatter.success(&format!(
            "Uploaded {} files ({size_human}) and deleted {} files in {} ms",
            report.execution.uploaded, report.execution.deleted, report.elapsed_ms
        ));
    }

    ExitCode::Success
}
