//! plan command - Show what a sync would change
//!
//! Builds both inventories and prints the resulting uploads and deletes
//! without writing to the bucket.

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

use bs_core::{FileKey, PlannedSync, SyncEngine};

use super::source::SourceArgs;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Reporter};

/// Show the uploads and deletes a sync would perform
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Serialize)]
struct PlanOutput {
    local_files: usize,
    remote_files: usize,
    incremental: bool,
    delete_enabled: bool,
    upload: Vec<FileKey>,
    delete: Vec<FileKey>,
}

/// Execute the plan command
pub async fn execute(args: PlanArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    let (job, client) = match args.source.prepare().await {
        Ok(prepared) => prepared,
        Err(e) => {
            formatter.error(&format!("Failed to prepare sync: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let reporter = Reporter::new(output_config);
    let planned = match SyncEngine::new(&client, &job)
        .with_events(&reporter)
        .plan()
        .await
    {
        Ok(planned) => planned,
        Err(e) => {
            reporter.abort();
            formatter.error(&format!("Failed to build plan: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&PlanOutput {
            local_files: planned.local.len(),
            remote_files: planned.remote.len(),
            incremental: job.incremental,
            delete_enabled: job.delete,
            upload: planned.plan.upload,
            delete: planned.plan.delete,
        });
        return ExitCode::Success;
    }

    if planned.plan.is_empty() {
        formatter.success("Bucket is already up to date");
        return ExitCode::Success;
    }

    formatter.println(&plan_table(&planned, job.delete).to_string());
    formatter.println(&format!(
        "{} to upload, {} to delete",
        planned.plan.upload.len(),
        if job.delete { planned.plan.delete.len() } else { 0 }
    ));

    ExitCode::Success
}

fn plan_table(planned: &PlannedSync, delete_enabled: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(vec!["Action", "Key", "Fingerprint"]);

    for key in &planned.plan.upload {
        let fingerprint = planned.local.get(key).cloned().unwrap_or_default();
        table.add_row(vec!["upload".to_string(), key.clone(), fingerprint]);
    }

    let action = if delete_enabled { "delete" } else { "keep" };
    for key in &planned.plan.delete {
        let fingerprint = planned.remote.get(key).cloned().unwrap_or_default();
        table.add_row(vec![action.to_string(), key.clone(), fingerprint]);
    }

    table
}
