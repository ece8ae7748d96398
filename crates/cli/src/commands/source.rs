//! Configuration sources shared by `sync` and `plan`
//!
//! Values come from an optional TOML file, then the `INPUT_<NAME>`
//! environment variables set by CI actions, then command-line flags; later
//! sources win.

use std::path::PathBuf;

use clap::Args;
use clap::builder::BoolishValueParser;

use bs_core::{Result, SyncConfig, SyncJob};
use bs_s3::S3Client;

/// Storage and sync settings
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// TOML file with [storage] and [sync] tables
    #[arg(short, long, env = "BSYNC_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Access key ID
    #[arg(long, env = "INPUT_ACCESS-KEY-ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    /// Secret access key
    #[arg(long, env = "INPUT_ACCESS-KEY-SECRET", hide_env_values = true)]
    pub access_key_secret: Option<String>,

    /// Session token for temporary credentials
    #[arg(long, env = "INPUT_SECURITY-TOKEN", hide_env_values = true)]
    pub security_token: Option<String>,

    /// Target bucket
    #[arg(long, env = "INPUT_BUCKET")]
    pub bucket: Option<String>,

    /// Service endpoint, e.g. https://oss-cn-hangzhou.aliyuncs.com
    #[arg(long, env = "INPUT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Signing region (default: us-east-1)
    #[arg(long, env = "INPUT_REGION")]
    pub region: Option<String>,

    /// Use path-style addressing (default: true)
    #[arg(
        long,
        env = "INPUT_FORCE-PATH-STYLE",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub force_path_style: Option<bool>,

    /// Local directory to upload
    #[arg(long, env = "INPUT_LOCAL-PATH")]
    pub local_path: Option<String>,

    /// Remote prefix objects are placed under (default: bucket root)
    #[arg(long, env = "INPUT_REMOTE-PATH")]
    pub remote_path: Option<String>,

    /// Only sync files whose relative path matches this pattern
    #[arg(long, env = "INPUT_INCLUDE-REGEX")]
    pub include_regex: Option<String>,

    /// Never sync files whose relative path matches this pattern
    #[arg(long, env = "INPUT_EXCLUDE-REGEX")]
    pub exclude_regex: Option<String>,

    /// Upload headers as JSON: an object, or a list of {"match", "headers"} rules
    #[arg(long, env = "INPUT_HEADERS")]
    pub headers: Option<String>,

    /// Upload .html files after everything else
    #[arg(
        long,
        env = "INPUT_DELAY-HTML-FILE-UPLOAD",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub delay_html_file_upload: Option<bool>,

    /// Keep remote files that no longer exist locally
    #[arg(
        long,
        env = "INPUT_NO-DELETE-REMOTE-FILES",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub no_delete_remote_files: Option<bool>,

    /// Attempts per remote operation (default: 5)
    #[arg(long, env = "INPUT_RETRY")]
    pub retry: Option<String>,

    /// Only upload new or changed files
    #[arg(
        long,
        env = "INPUT_INCREMENTAL",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub incremental: Option<bool>,

    /// Maximum concurrent uploads or deletes (default: 16)
    #[arg(long, env = "INPUT_CONCURRENCY")]
    pub concurrency: Option<usize>,
}

fn overlay<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl SourceArgs {
    /// Merge the config file with environment and flag values
    pub fn resolve(&self) -> Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::load(path)?,
            None => SyncConfig::default(),
        };

        let storage = &mut config.storage;
        overlay(&mut storage.access_key_id, &self.access_key_id);
        overlay(&mut storage.access_key_secret, &self.access_key_secret);
        overlay(&mut storage.bucket, &self.bucket);
        overlay(&mut storage.endpoint, &self.endpoint);
        if self.security_token.is_some() {
            storage.security_token = self.security_token.clone();
        }
        if self.region.is_some() {
            storage.region = self.region.clone();
        }
        if self.force_path_style.is_some() {
            storage.force_path_style = self.force_path_style;
        }

        let sync = &mut config.sync;
        overlay(&mut sync.local_path, &self.local_path);
        overlay(&mut sync.remote_path, &self.remote_path);
        overlay(&mut sync.include_regex, &self.include_regex);
        overlay(&mut sync.exclude_regex, &self.exclude_regex);
        overlay(&mut sync.headers, &self.headers);
        overlay(&mut sync.delay_html_file_upload, &self.delay_html_file_upload);
        overlay(&mut sync.no_delete_remote_files, &self.no_delete_remote_files);
        overlay(&mut sync.retry, &self.retry);
        overlay(&mut sync.incremental, &self.incremental);
        if self.concurrency.is_some() {
            sync.concurrency = self.concurrency;
        }

        Ok(config)
    }

    /// Resolve and validate the settings and connect to the bucket
    pub async fn prepare(&self) -> Result<(SyncJob, S3Client)> {
        let config = self.resolve()?;
        let job = config.validate()?;
        let client = S3Client::new(&config.storage).await?;
        tracing::debug!(
            bucket = client.bucket(),
            prefix = %job.prefix,
            local = %job.local_root.display(),
            "Prepared sync job"
        );
        Ok((job, client))
    }
}
