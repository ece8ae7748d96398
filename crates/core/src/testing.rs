//! In-memory object store for engine tests

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::inventory::fingerprint_bytes;
use crate::traits::{HeaderMap, ListOptions, ListPage, ObjectStore, RemoteObject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub etag: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Bucket kept in memory; records every call in order
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    log: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, u32>>,
    page_size: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve listings in pages of `size` regardless of the requested limit
    pub fn with_page_size(size: usize) -> Self {
        Self {
            page_size: Some(size),
            ..Self::default()
        }
    }

    /// Seed an object whose ETag is the MD5 of `body`
    pub fn seed(&self, key: &str, body: &[u8]) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                etag: format!("\"{}\"", fingerprint_bytes(body)),
                headers: HeaderMap::new(),
                body: body.to_vec(),
            },
        );
    }

    /// Make the next `times` operations on `key` fail
    pub fn fail(&self, key: &str, times: u32) {
        self.failures.lock().unwrap().insert(key.to_string(), times);
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn check_failure(&self, key: &str) -> Result<()> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(Error::Storage(format!("injected failure for {key}")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, prefix: &str, options: ListOptions) -> Result<ListPage> {
        self.record(format!("list:{prefix}"));
        let limit = self.page_size.unwrap_or(options.max_keys as usize);
        let start: usize = options
            .continuation_token
            .as_deref()
            .map(|t| t.parse().unwrap())
            .unwrap_or(0);

        let objects = self.objects.lock().unwrap();
        let matching: Vec<RemoteObject> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .skip(start)
            .take(limit)
            .map(|(key, object)| RemoteObject::new(key.clone(), object.etag.clone()))
            .collect();
        let remaining = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .count()
            .saturating_sub(start + matching.len());

        Ok(ListPage {
            next_token: (remaining > 0).then(|| (start + matching.len()).to_string()),
            objects: matching,
        })
    }

    async fn put_object(&self, key: &str, source: &Path, headers: &HeaderMap) -> Result<u64> {
        self.record(format!("put-start:{key}"));
        self.check_failure(key)?;
        let body = tokio::fs::read(source).await?;
        tokio::task::yield_now().await;
        let size = body.len() as u64;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                etag: format!("\"{}\"", fingerprint_bytes(&body).to_uppercase()),
                headers: headers.clone(),
                body,
            },
        );
        self.record(format!("put-end:{key}"));
        Ok(size)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.record(format!("delete:{key}"));
        self.check_failure(key)?;
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
