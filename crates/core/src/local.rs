//! Local inventory
//!
//! Walks the local tree, filters relative keys through the include/exclude
//! patterns and fingerprints every remaining regular file.

use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt, stream};
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::events::{Phase, SyncEvents};
use crate::inventory::{Inventory, fingerprint_bytes};
use crate::path::{FileKey, relative_key};

/// Number of files read and hashed at the same time
const HASH_CONCURRENCY: usize = 32;

/// Include/exclude filter over relative keys
///
/// A key passes when `include` matches and `exclude` does not. An empty
/// include pattern matches everything; an empty exclude pattern matches
/// nothing.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl PathFilter {
    /// Compile the two patterns
    pub fn new(include: &str, exclude: &str) -> Result<Self> {
        Ok(Self {
            include: compile("include", include)?,
            exclude: compile("exclude", exclude)?,
        })
    }

    /// Filter that accepts every key
    pub fn allow_all() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }

    pub fn accepts(&self, key: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|re| re.is_match(key));
        let excluded = self.exclude.as_ref().is_some_and(|re| re.is_match(key));
        included && !excluded
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}

fn compile(name: &str, pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|e| Error::Configuration(format!("invalid {name} pattern {pattern:?}: {e}")))
}

/// Build the inventory of `root`
///
/// Fails if the root or any selected file cannot be read; a partial
/// inventory is never returned.
#[tracing::instrument(name = "list_local", skip_all, fields(root = %root.display()))]
pub async fn list_local(
    root: &Path,
    filter: &PathFilter,
    events: &dyn SyncEvents,
) -> Result<Inventory> {
    let root = std::path::absolute(root).map_err(|e| Error::filesystem(root, e))?;
    let metadata = tokio::fs::metadata(&root)
        .await
        .map_err(|e| Error::filesystem(&root, e))?;
    if !metadata.is_dir() {
        return Err(Error::filesystem(&root, "not a directory"));
    }

    events.phase_started(Phase::ListLocal, None);

    let walk_root = root.clone();
    let files = tokio::task::spawn_blocking(move || walk_files(&walk_root))
        .await
        .map_err(|e| Error::Filesystem(format!("directory walk aborted: {e}")))??;

    let mut selected = Vec::with_capacity(files.len());
    for (path, key) in files {
        if filter.accepts(&key) {
            selected.push((path, key));
        } else {
            tracing::info!("Skipping local file {key:?}");
            events.file_skipped(&key);
        }
    }

    let hashed: Vec<(FileKey, String)> = stream::iter(selected)
        .map(|(path, key)| async move {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| Error::filesystem(&path, e))?;
            Ok::<_, Error>((key, fingerprint_bytes(&bytes)))
        })
        .buffer_unordered(HASH_CONCURRENCY)
        .try_collect()
        .await?;

    let inventory: Inventory = hashed.into_iter().collect();
    tracing::debug!(root = %root.display(), files = inventory.len(), "Listed local files");
    events.phase_finished(Phase::ListLocal);

    Ok(inventory)
}

/// Regular files under `root` with their keys; symlinks are not followed
fn walk_files(root: &Path) -> Result<Vec<(PathBuf, FileKey)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::filesystem(&path, e)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let key = relative_key(root, entry.path())?;
        files.push((entry.into_path(), key));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEvents;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn write(root: &Path, key: &str, contents: &str) {
        let path = root.join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[derive(Default)]
    struct SkipRecorder(Mutex<Vec<String>>);

    impl SyncEvents for SkipRecorder {
        fn file_skipped(&self, key: &str) {
            self.0.lock().unwrap().push(key.to_string());
        }
    }

    #[test]
    fn test_filter_semantics() {
        let filter = PathFilter::new(r".*\.txt$", "^tmp/").unwrap();
        assert!(!filter.accepts("tmp/a.txt"));
        assert!(filter.accepts("docs/a.txt"));
        assert!(!filter.accepts("docs/a.md"));
    }

    #[test]
    fn test_empty_patterns_accept_everything() {
        let filter = PathFilter::new("", "").unwrap();
        assert!(filter.accepts("index.html"));
        assert!(filter.accepts("deep/nested/file"));
        assert!(PathFilter::default().accepts("x"));
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let err = PathFilter::new("(unclosed", "").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("include"));
    }

    #[tokio::test]
    async fn test_list_local_fingerprints_and_filters() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docs/a.txt", "hello");
        write(dir.path(), "docs/a.md", "# title");
        write(dir.path(), "tmp/a.txt", "scratch");
        write(dir.path(), "root.txt", "");

        let filter = PathFilter::new(r".*\.txt$", "^tmp/").unwrap();
        let recorder = SkipRecorder::default();
        let inventory = list_local(dir.path(), &filter, &recorder).await.unwrap();

        assert_eq!(inventory.len(), 2);
        assert_eq!(
            inventory.get("docs/a.txt").map(String::as_str),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
        assert_eq!(
            inventory.get("root.txt").map(String::as_str),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );

        let mut skipped = recorder.0.into_inner().unwrap();
        skipped.sort();
        assert_eq!(skipped, ["docs/a.md", "tmp/a.txt"]);
    }

    #[tokio::test]
    async fn test_list_local_skips_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("empty/inner")).unwrap();
        write(dir.path(), "file", "x");

        let inventory = list_local(dir.path(), &PathFilter::allow_all(), &NoopEvents)
            .await
            .unwrap();
        let keys: Vec<&str> = inventory.keys().map(String::as_str).collect();
        assert_eq!(keys, ["file"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_local_ignores_symlinks() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "real.txt", "x");
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();

        let inventory = list_local(dir.path(), &PathFilter::allow_all(), &NoopEvents)
            .await
            .unwrap();
        assert!(inventory.contains_key("real.txt"));
        assert!(!inventory.contains_key("link.txt"));
    }

    #[tokio::test]
    async fn test_list_local_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = list_local(&missing, &PathFilter::allow_all(), &NoopEvents)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Filesystem(_)));
    }

    #[tokio::test]
    async fn test_list_local_root_is_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "plain", "x");

        let err = list_local(&dir.path().join("plain"), &PathFilter::allow_all(), &NoopEvents)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
