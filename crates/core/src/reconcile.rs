//! Reconciliation of local and remote inventories into a sync plan

use serde::Serialize;

use crate::inventory::Inventory;
use crate::path::FileKey;

/// Keys to upload and keys to delete, in source inventory order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub upload: Vec<FileKey>,
    pub delete: Vec<FileKey>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.upload.is_empty() && self.delete.is_empty()
    }
}

/// Diff the two inventories
///
/// In incremental mode only new or changed local files are uploaded;
/// otherwise every local file is. Remote keys missing locally are always
/// scheduled for deletion.
pub fn reconcile(local: &Inventory, remote: &Inventory, incremental: bool) -> SyncPlan {
    let upload = local
        .iter()
        .filter(|(key, fingerprint)| !incremental || remote.get(key) != Some(*fingerprint))
        .map(|(key, _)| key.clone())
        .collect();

    let delete = remote
        .keys()
        .filter(|key| !local.contains_key(key))
        .cloned()
        .collect();

    SyncPlan { upload, delete }
}
