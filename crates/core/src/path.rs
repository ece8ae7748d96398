//! Path normalization
//!
//! Keeps local relative paths and remote object keys in one key space:
//! keys are `/`-separated, never start with `/`, and the remote prefix is
//! either empty (bucket root) or ends with exactly one `/`.

use std::path::{Component, Path};

use crate::error::{Error, Result};

/// A POSIX-style relative path, the join key between local and remote inventories
pub type FileKey = String;

/// Normalize a path string and enforce the slash policy
///
/// Resolves `.`, `..` and repeated separators lexically, then adds or strips
/// the leading and trailing slash as requested. A path that collapses to the
/// root (`/` or empty) yields `when_root` instead.
pub fn normalize(path: &str, leading_slash: bool, trailing_slash: bool, when_root: &str) -> String {
    // `..` must resolve against the root when the result is going to be absolute
    let mut normalized = if leading_slash && !path.starts_with('/') {
        posix_normalize(&format!("/{path}"))
    } else {
        posix_normalize(path)
    };

    if leading_slash && !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }
    if !leading_slash && normalized.starts_with('/') {
        normalized.remove(0);
    }

    if trailing_slash && !normalized.ends_with('/') {
        normalized.push('/');
    }
    if !trailing_slash && normalized.ends_with('/') {
        normalized.pop();
    }

    if normalized.is_empty() || normalized == "/" {
        return when_root.to_string();
    }

    normalized
}

/// Canonical form of a configured remote path: no leading slash, one trailing
/// slash, and the empty string for the bucket root
pub fn remote_prefix(raw: &str) -> String {
    normalize(raw, false, true, "")
}

/// Full object name for a key under a normalized prefix
pub fn object_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

/// Build the `/`-separated key of `path` relative to `root`
pub fn relative_key(root: &Path, path: &Path) -> Result<FileKey> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::filesystem(path, format!("not under {}", root.display())))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| Error::filesystem(path, "file name is not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => return Err(Error::filesystem(path, "unexpected path component")),
        }
    }

    Ok(parts.join("/"))
}

/// Lexical POSIX normalization. The current directory normalizes to the
/// empty string rather than `.` so the root check above stays simple.
fn posix_normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut out = segments.join("/");
    if trailing && !out.is_empty() {
        out.push('/');
    }
    if absolute {
        out.insert(0, '/');
    }
    out
}
