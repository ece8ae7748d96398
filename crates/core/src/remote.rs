//! Remote inventory
//!
//! Pages through the listing under a prefix and turns every object into a
//! key/fingerprint pair relative to that prefix.

use crate::error::{Error, Result};
use crate::events::{Phase, SyncEvents};
use crate::inventory::{Inventory, fingerprint_from_etag};
use crate::retry::RetryPolicy;
use crate::traits::{ListOptions, ObjectStore};

/// Build the inventory of everything stored under `prefix`
///
/// `prefix` must already be normalized (see [`crate::path::remote_prefix`]).
/// Each page request is retried independently.
#[tracing::instrument(name = "list_remote", skip_all, fields(prefix = %prefix))]
pub async fn list_remote(
    store: &dyn ObjectStore,
    prefix: &str,
    retry: &RetryPolicy,
    events: &dyn SyncEvents,
) -> Result<Inventory> {
    events.phase_started(Phase::ListRemote, None);

    let mut inventory = Inventory::new();
    let mut continuation_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let options = ListOptions {
            continuation_token: continuation_token.take(),
            ..Default::default()
        };

        let page = retry
            .run("list objects", || store.list_objects(prefix, options.clone()))
            .await?;
        pages += 1;

        for object in page.objects {
            let key = object.key.strip_prefix(prefix).ok_or_else(|| {
                Error::Storage(format!(
                    "listing returned {:?} which is outside prefix {prefix:?}",
                    object.key
                ))
            })?;
            if key.is_empty() {
                tracing::debug!("Ignoring prefix marker object {:?}", object.key);
                continue;
            }
            inventory.insert(key, fingerprint_from_etag(&object.etag));
        }

        match page.next_token {
            Some(token) if !token.is_empty() => continuation_token = Some(token),
            _ => break,
        }
    }

    tracing::debug!(prefix, pages, objects = inventory.len(), "Listed remote files");
    events.phase_finished(Phase::ListRemote);

    Ok(inventory)
}
