//! bs-core: Reconciliation engine for bucket-sync
//!
//! This crate provides the core functionality of a one-way directory to
//! bucket sync, including:
//! - Path normalization shared by local and remote key spaces
//! - Local and remote inventories with content fingerprints
//! - Reconciliation into upload/delete plans
//! - Plan execution with retry and two-phase upload ordering
//! - ObjectStore trait for the storage transport
//!
//! This crate is designed to be independent of any specific S3 SDK,
//! allowing for easy testing and potential future support for other backends.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod headers;
pub mod inventory;
pub mod local;
pub mod path;
pub mod reconcile;
pub mod remote;
pub mod retry;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::{StorageConfig, SyncConfig, SyncJob, SyncSettings};
pub use engine::{PlannedSync, SyncEngine, SyncReport};
pub use error::{Error, Result};
pub use events::{NoopEvents, Phase, SyncEvents};
pub use executor::{ExecuteOptions, ExecutionReport, execute, upload_batches};
pub use headers::{HeaderRules, is_upload_header};
pub use inventory::{Fingerprint, Inventory};
pub use local::{PathFilter, list_local};
pub use path::{FileKey, normalize, remote_prefix};
pub use reconcile::{SyncPlan, reconcile};
pub use remote::list_remote;
pub use retry::{Backoff, RetryPolicy};
pub use traits::{HeaderMap, ListOptions, ListPage, ObjectStore, RemoteObject};
