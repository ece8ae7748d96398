//! Inventories: snapshots of key → fingerprint
//!
//! Local fingerprints are MD5 digests of the file bytes. Remote fingerprints
//! are the provider's ETag, which equals the MD5 digest for objects uploaded
//! in a single PUT.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use serde::Serialize;

use crate::path::FileKey;

/// Lowercase hexadecimal content hash
pub type Fingerprint = String;

/// Fingerprint of a byte buffer
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    format!("{:x}", Md5::digest(bytes))
}

/// Fingerprint from a provider integrity tag: quotes removed, lowercased
pub fn fingerprint_from_etag(etag: &str) -> Fingerprint {
    etag.replace('"', "").to_lowercase()
}

/// Snapshot mapping of relative key to fingerprint
///
/// Iteration order is the key order, so plans and logs are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Inventory {
    entries: BTreeMap<FileKey, Fingerprint>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key; a repeated key replaces the earlier fingerprint
    pub fn insert(&mut self, key: impl Into<FileKey>, fingerprint: impl Into<Fingerprint>) {
        self.entries.insert(key.into(), fingerprint.into());
    }

    pub fn get(&self, key: &str) -> Option<&Fingerprint> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FileKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FileKey, &Fingerprint)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Inventory
where
    K: Into<FileKey>,
    V: Into<Fingerprint>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut inventory = Inventory::new();
        for (key, fingerprint) in iter {
            inventory.insert(key, fingerprint);
        }
        inventory
    }
}
