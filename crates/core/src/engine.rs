//! Sync engine
//!
//! Composes a run: both inventories are built concurrently, diffed into a
//! plan, and the plan is executed against the store.

use std::time::Instant;

use serde::Serialize;

use crate::config::SyncJob;
use crate::error::Result;
use crate::events::{NoopEvents, SyncEvents};
use crate::executor::{ExecutionReport, execute};
use crate::inventory::Inventory;
use crate::local::list_local;
use crate::reconcile::{SyncPlan, reconcile};
use crate::remote::list_remote;
use crate::traits::ObjectStore;

/// Inventories and the plan derived from them
#[derive(Debug, Clone, Serialize)]
pub struct PlannedSync {
    pub local: Inventory,
    pub remote: Inventory,
    pub plan: SyncPlan,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: jiff::Timestamp,
    pub elapsed_ms: u64,
    pub local_files: usize,
    pub remote_files: usize,
    pub plan: SyncPlan,
    #[serde(flatten)]
    pub execution: ExecutionReport,
}

/// Runs one sync pass of a job against a store
pub struct SyncEngine<'a> {
    store: &'a dyn ObjectStore,
    job: &'a SyncJob,
    events: &'a dyn SyncEvents,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a dyn ObjectStore, job: &'a SyncJob) -> Self {
        Self {
            store,
            job,
            events: &NoopEvents,
        }
    }

    /// Report progress to `events`
    pub fn with_events(mut self, events: &'a dyn SyncEvents) -> Self {
        self.events = events;
        self
    }

    /// Build both inventories and diff them, without changing anything
    pub async fn plan(&self) -> Result<PlannedSync> {
        let (local, remote) = tokio::try_join!(
            list_local(&self.job.local_root, &self.job.filter, self.events),
            list_remote(self.store, &self.job.prefix, &self.job.retry, self.events),
        )?;

        let plan = reconcile(&local, &remote, self.job.incremental);
        tracing::info!(
            local = local.len(),
            remote = remote.len(),
            upload = plan.upload.len(),
            delete = plan.delete.len(),
            incremental = self.job.incremental,
            "Computed sync plan"
        );

        Ok(PlannedSync {
            local,
            remote,
            plan,
        })
    }

    /// Plan and execute one sync pass
    pub async fn run(&self, dry_run: bool) -> Result<SyncReport> {
        let started_at = jiff::Timestamp::now();
        let clock = Instant::now();

        let planned = self.plan().await?;
        let options = self.job.execute_options(dry_run);
        let execution = execute(self.store, &planned.plan, &options, self.events).await?;

        Ok(SyncReport {
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            local_files: planned.local.len(),
            remote_files: planned.remote.len(),
            plan: planned.plan,
            execution,
        })
    }
}
