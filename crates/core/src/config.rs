//! Configuration
//!
//! A run is described by one immutable [`SyncConfig`]. It can be loaded from
//! a TOML file and then overlaid with values from the environment and the
//! command line; [`SyncConfig::validate`] turns it into a [`SyncJob`] with
//! compiled patterns and header rules.
//!
//! ```toml
//! [storage]
//! access_key_id = "..."
//! access_key_secret = "..."
//! bucket = "www"
//! endpoint = "https://s3.example.com"
//!
//! [sync]
//! local_path = "public"
//! remote_path = "/"
//! exclude_regex = "^drafts/"
//! incremental = true
//! retry = 3
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::executor::{DEFAULT_CONCURRENCY, ExecuteOptions};
use crate::headers::HeaderRules;
use crate::local::PathFilter;
use crate::path::remote_prefix;
use crate::retry::{Backoff, RetryPolicy};

/// Default signing region for S3-compatible endpoints
const DEFAULT_REGION: &str = "us-east-1";

/// Complete configuration of a sync run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sync: SyncSettings,
}

/// Connection details for the bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_token: Option<String>,
    pub bucket: String,
    /// Service endpoint; `https://` is assumed when no scheme is given
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Path-style addressing (`endpoint/bucket/key`); defaults to true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_path_style: Option<bool>,
}

/// What to sync and how
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    pub local_path: String,
    pub remote_path: String,
    pub include_regex: String,
    pub exclude_regex: String,
    /// JSON header configuration, see [`HeaderRules`]
    pub headers: String,
    pub delay_html_file_upload: bool,
    pub no_delete_remote_files: bool,
    /// Attempt count; accepts a number or a string
    #[serde(deserialize_with = "string_or_number")]
    pub retry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_base_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_max_ms: Option<u64>,
    pub incremental: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

impl SyncConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    /// Check required values and compile everything a run needs
    pub fn validate(&self) -> Result<SyncJob> {
        self.storage.validate()?;

        let sync = &self.sync;
        if sync.local_path.trim().is_empty() {
            return Err(Error::Configuration("local-path is required".into()));
        }

        let mut backoff = Backoff::default();
        if let Some(base) = sync.retry_base_ms {
            backoff.base_ms = base;
            backoff.max_ms = backoff.max_ms.max(base);
        }
        if let Some(max) = sync.retry_max_ms {
            backoff.max_ms = max;
        }

        let concurrency = sync.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(Error::Configuration("concurrency must be at least 1".into()));
        }

        Ok(SyncJob {
            local_root: PathBuf::from(&sync.local_path),
            prefix: remote_prefix(&sync.remote_path),
            filter: PathFilter::new(&sync.include_regex, &sync.exclude_regex)?,
            headers: HeaderRules::parse(&sync.headers)?,
            retry: RetryPolicy::from_setting(&sync.retry, backoff),
            delay_html: sync.delay_html_file_upload,
            delete: !sync.no_delete_remote_files,
            incremental: sync.incremental,
            concurrency,
        })
    }
}

impl StorageConfig {
    /// Check that every connection value is present and the endpoint parses
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("access-key-id", &self.access_key_id),
            ("access-key-secret", &self.access_key_secret),
            ("bucket", &self.bucket),
            ("endpoint", &self.endpoint),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{name} is required")));
            }
        }
        self.endpoint_url()?;
        Ok(())
    }

    /// Endpoint as an absolute URL
    pub fn endpoint_url(&self) -> Result<url::Url> {
        let endpoint = self.endpoint.trim();
        let url = if endpoint.contains("://") {
            url::Url::parse(endpoint)?
        } else {
            url::Url::parse(&format!("https://{endpoint}"))?
        };
        Ok(url)
    }

    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    pub fn force_path_style(&self) -> bool {
        self.force_path_style.unwrap_or(true)
    }

    /// Session token, treating an empty value as absent
    pub fn session_token(&self) -> Option<&str> {
        self.security_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Validated, compiled settings of a run
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub local_root: PathBuf,
    /// Normalized remote prefix: empty or ending with `/`
    pub prefix: String,
    pub filter: PathFilter,
    pub headers: HeaderRules,
    pub retry: RetryPolicy,
    pub delay_html: bool,
    pub delete: bool,
    pub incremental: bool,
    pub concurrency: usize,
}

impl SyncJob {
    /// Options for the executor derived from this job
    pub fn execute_options(&self, dry_run: bool) -> ExecuteOptions {
        ExecuteOptions {
            local_root: self.local_root.clone(),
            prefix: self.prefix.clone(),
            headers: self.headers.clone(),
            delay_html: self.delay_html,
            delete: self.delete,
            concurrency: self.concurrency,
            dry_run,
            retry: self.retry,
        }
    }
}
