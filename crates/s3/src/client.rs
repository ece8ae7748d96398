//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from bs-core.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use bs_core::{
    Error, HeaderMap, ListOptions, ListPage, ObjectStore, RemoteObject, Result, StorageConfig,
};

use crate::upload::UploadHeaders;

/// S3 client wrapper bound to one bucket
#[derive(Debug, Clone)]
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from the storage configuration
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint_url()?;

        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            config.access_key_id.clone(),
            config.access_key_secret.clone(),
            config.session_token().map(str::to_string),
            None, // expiry
            "bsync-static-credentials",
        );

        // Build SDK config
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region().to_string()))
            .endpoint_url(endpoint.as_str().trim_end_matches('/'))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style())
            .build();

        tracing::debug!(
            endpoint = %endpoint,
            bucket = %config.bucket,
            region = config.region(),
            "Created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn storage_error<E>(action: &str, key: &str, err: E) -> Error
where
    E: std::error::Error,
{
    Error::Storage(format!("{action} {key:?} failed: {}", DisplayErrorContext(err)))
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(&self, prefix: &str, options: ListOptions) -> Result<ListPage> {
        let mut request = self
            .inner
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(options.max_keys);

        // Set continuation token
        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| storage_error("list", prefix, e))?;

        let objects = response
            .contents()
            .iter()
            .map(|object| RemoteObject {
                key: object.key().unwrap_or_default().to_string(),
                etag: object.e_tag().unwrap_or_default().to_string(),
                size_bytes: object.size(),
            })
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(|s| s.to_string())
        } else {
            None
        };

        Ok(ListPage {
            objects,
            next_token,
        })
    }

    async fn put_object(&self, key: &str, source: &Path, headers: &HeaderMap) -> Result<u64> {
        let upload_headers = UploadHeaders::from_map(key, headers)?;

        let size = tokio::fs::metadata(source)
            .await
            .map_err(|e| Error::filesystem(source, e))?
            .len();
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| Error::filesystem(source, e))?;

        let request = self
            .inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body);

        upload_headers
            .apply(request)
            .send()
            .await
            .map_err(|e| storage_error("upload", key, e))?;

        Ok(size)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error("delete", key, e))?;

        Ok(())
    }
}
