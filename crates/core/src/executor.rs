//! Execution of a sync plan against the object store
//!
//! Uploads run first, optionally in two strictly sequential batches so that
//! HTML pages are published only after the assets they reference. Deletes
//! run after the whole upload phase. Every single action is retried on its
//! own, and the first action that runs out of attempts fails the run.

use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;

use crate::error::Result;
use crate::events::{Phase, SyncEvents};
use crate::headers::HeaderRules;
use crate::path::{FileKey, object_key};
use crate::reconcile::SyncPlan;
use crate::retry::RetryPolicy;
use crate::traits::ObjectStore;

/// Extension of the files held back by the delayed upload ordering
pub const DEFERRED_EXTENSION: &str = ".html";

/// Default number of transfers in flight at once
pub const DEFAULT_CONCURRENCY: usize = 16;

/// How a plan is carried out
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Directory the upload keys are relative to
    pub local_root: PathBuf,

    /// Normalized remote prefix the keys are placed under
    pub prefix: String,

    /// Headers attached to each upload
    pub headers: HeaderRules,

    /// Upload HTML files only after everything else
    pub delay_html: bool,

    /// Run the delete phase
    pub delete: bool,

    /// Maximum transfers in flight
    pub concurrency: usize,

    /// Log the plan without touching the store
    pub dry_run: bool,

    pub retry: RetryPolicy,
}

impl ExecuteOptions {
    pub fn new(local_root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            prefix: prefix.into(),
            headers: HeaderRules::default(),
            delay_html: false,
            delete: true,
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of an executed plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub uploaded: usize,
    pub deleted: usize,
    pub bytes_uploaded: u64,
    pub delete_skipped: bool,
    pub dry_run: bool,
}

/// Split uploads into sequential batches
///
/// With `delay_html` the first batch holds every key not ending in
/// [`DEFERRED_EXTENSION`] (case-insensitive) and the second the rest.
pub fn upload_batches(keys: &[FileKey], delay_html: bool) -> Vec<Vec<FileKey>> {
    if !delay_html {
        return vec![keys.to_vec()];
    }

    let (deferred, first): (Vec<FileKey>, Vec<FileKey>) = keys
        .iter()
        .cloned()
        .partition(|key| key.to_lowercase().ends_with(DEFERRED_EXTENSION));
    vec![first, deferred]
}

/// Carry out `plan`
#[tracing::instrument(name = "execute", skip_all, fields(dry_run = options.dry_run))]
pub async fn execute(
    store: &dyn ObjectStore,
    plan: &SyncPlan,
    options: &ExecuteOptions,
    events: &dyn SyncEvents,
) -> Result<ExecutionReport> {
    if options.dry_run {
        return Ok(describe(plan, options));
    }

    let mut report = ExecutionReport::default();
    let concurrency = options.concurrency.max(1);

    events.phase_started(Phase::Upload, Some(plan.upload.len()));
    for batch in upload_batches(&plan.upload, options.delay_html) {
        let sizes: Vec<u64> = stream::iter(batch.iter())
            .map(|key| upload(store, key, options, events))
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;
        report.uploaded += sizes.len();
        report.bytes_uploaded += sizes.iter().sum::<u64>();
    }
    events.phase_finished(Phase::Upload);

    if !options.delete {
        tracing::info!(
            pending = plan.delete.len(),
            "Remote file deletion disabled, skipping delete phase"
        );
        report.delete_skipped = true;
        return Ok(report);
    }

    events.phase_started(Phase::Delete, Some(plan.delete.len()));
    let deleted: Vec<()> = stream::iter(plan.delete.iter())
        .map(|key| delete(store, key, options, events))
        .buffer_unordered(concurrency)
        .try_collect()
        .await?;
    report.deleted = deleted.len();
    events.phase_finished(Phase::Delete);

    Ok(report)
}

async fn upload(
    store: &dyn ObjectStore,
    key: &FileKey,
    options: &ExecuteOptions,
    events: &dyn SyncEvents,
) -> Result<u64> {
    let source = local_path(&options.local_root, key);
    let target = object_key(&options.prefix, key);
    let headers = options.headers.headers_for(key);

    let label = format!("upload of {key:?}");
    let bytes = options
        .retry
        .run(&label, || store.put_object(&target, &source, &headers))
        .await?;

    tracing::info!("Uploaded file {key:?}");
    events.file_uploaded(key, bytes);
    Ok(bytes)
}

async fn delete(
    store: &dyn ObjectStore,
    key: &FileKey,
    options: &ExecuteOptions,
    events: &dyn SyncEvents,
) -> Result<()> {
    let target = object_key(&options.prefix, key);

    let label = format!("delete of {key:?}");
    options
        .retry
        .run(&label, || store.delete_object(&target))
        .await?;

    tracing::info!("Deleted file {key:?}");
    events.file_deleted(key);
    Ok(())
}

fn describe(plan: &SyncPlan, options: &ExecuteOptions) -> ExecutionReport {
    for batch in upload_batches(&plan.upload, options.delay_html) {
        for key in batch {
            tracing::info!("Would upload {key:?} to {:?}", object_key(&options.prefix, &key));
        }
    }
    if options.delete {
        for key in &plan.delete {
            tracing::info!("Would delete {:?}", object_key(&options.prefix, key));
        }
    }

    ExecutionReport {
        uploaded: plan.upload.len(),
        deleted: if options.delete { plan.delete.len() } else { 0 },
        bytes_uploaded: 0,
        delete_skipped: !options.delete,
        dry_run: true,
    }
}

/// Local file for a key; keys always use `/` separators
fn local_path(root: &Path, key: &str) -> PathBuf {
    key.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}
