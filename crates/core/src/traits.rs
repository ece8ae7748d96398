//! ObjectStore trait definition
//!
//! This trait defines the storage transport the sync engine needs: a
//! paginated listing plus single-object PUT and DELETE. It allows the engine
//! to be decoupled from the specific S3 SDK implementation.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Largest page the listing is asked for
pub const MAX_KEYS_PER_PAGE: i32 = 1000;

/// HTTP headers attached to one upload, keyed by header name
pub type HeaderMap = BTreeMap<String, String>;

/// An object returned by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Full object name, including the listing prefix
    pub key: String,

    /// Integrity tag as returned by the provider (may still carry quotes)
    pub etag: String,

    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
}

impl RemoteObject {
    pub fn new(key: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            etag: etag.into(),
            size_bytes: None,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Objects on this page
    pub objects: Vec<RemoteObject>,

    /// Token for the next page; `None` when the listing is complete
    pub next_token: Option<String>,
}

/// Options for list operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of keys to return per request
    pub max_keys: i32,

    /// Continuation token for pagination
    pub continuation_token: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            max_keys: MAX_KEYS_PER_PAGE,
            continuation_token: None,
        }
    }
}

/// Trait for the storage transport used by the sync engine
///
/// Implementations must tolerate concurrent calls through a shared reference.
/// This trait is implemented by the S3 adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of objects whose names start with `prefix`
    async fn list_objects(&self, prefix: &str, options: ListOptions) -> Result<ListPage>;

    /// Upload the contents of `source` to `key` with the given headers
    ///
    /// Returns the number of bytes sent.
    async fn put_object(&self, key: &str, source: &Path, headers: &HeaderMap) -> Result<u64>;

    /// Delete the object at `key`
    async fn delete_object(&self, key: &str) -> Result<()>;
}
